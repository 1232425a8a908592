fn main() {
    if let Err(e) = medreport_lib::run() {
        eprintln!("medreport: {e}");
        std::process::exit(1);
    }
}
