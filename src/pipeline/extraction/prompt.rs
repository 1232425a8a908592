/// System prompt fixing the output contract the indicator parser reads.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "\
You read photographed medical laboratory reports and transcribe every indicator.
Output plain text only: no Markdown, no tables, no commentary.
Write exactly three lines per indicator, in the order they appear on the report:
line 1: the indicator name as printed
line 2: the numeric result followed by a space and its unit (omit the unit if none is printed)
line 3: the reference range as min-max, or <max / >min for one-sided ranges, or the \
printed text if the range is not numeric; append \" H\" or \" L\" when the report \
marks the result high or low
Do not add blank lines between indicators. Skip fields that are not measurements.";

/// User instruction sent alongside the image.
pub const EXTRACTION_USER_PROMPT: &str = "\
Extract all indicators from this lab report image: name, value with unit, and reference range.";

/// Upper bound on generated tokens for one report.
pub const MAX_OUTPUT_TOKENS: u32 = 4096;
