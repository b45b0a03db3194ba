//! RFC-4180 CSV row rendering: quote any value containing a
//! comma, double quote, or line break; double any embedded quote.

pub fn quote_field(value: &str) -> String {
 if value.contains([',', '"', '\n', '\r']) {
 format!("\"{}\"", value.replace('"', "\"\""))
 } else {
 value.to_string()
 }
}

pub fn write_row(fields: &[&str]) -> String {
 let mut line: String = fields
.iter()
.map(|f| quote_field(f))
.collect::<Vec<_>>()
.join(",");
 line.push('\n');
 line
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn plain_values_are_unquoted() {
 assert_eq!(quote_field("hello"), "hello");
 }

 #[test]
 fn commas_trigger_quoting() {
 assert_eq!(quote_field("a,b"), "\"a,b\"");
 }

 #[test]
 fn embedded_quotes_are_doubled() {
 assert_eq!(quote_field("say \"hi\""), "\"say \"\"hi\"\"\"");
 }

 #[test]
 fn newlines_trigger_quoting() {
 assert_eq!(quote_field("line1\nline2"), "\"line1\nline2\"");
 }
}
