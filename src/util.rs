//! Small utility helpers used across modules.

/// Normalize a roster roll-number cell: trim and drop any decimal suffix.
/// Spreadsheet exports often turn `11000100001` into `11000100001.0`.
pub fn normalize_roll_cell(raw: &str) -> String {
  let s = raw.trim();
  match s.split_once('.') {
    Some((head, _)) => head.trim().to_string(),
    None => s.to_string(),
  }
}

/// Split a comma-separated problems cell into trimmed, non-empty entries.
/// Keeps first-seen order and drops repeats.
pub fn split_problem_list(cell: &str) -> Vec<String> {
  let mut out: Vec<String> = Vec::new();
  for p in cell.split(',') {
    let p = p.trim();
    if !p.is_empty() && !out.iter().any(|x| x == p) {
      out.push(p.to_string());
    }
  }
  out
}

/// Split CSV text into records of fields.
/// Handles quoted fields, `""` escapes, and newlines inside quotes.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
  let text = text.strip_prefix('\u{feff}').unwrap_or(text);
  let mut records: Vec<Vec<String>> = Vec::new();
  let mut record: Vec<String> = Vec::new();
  let mut buf = String::new();
  let mut in_quotes = false;
  let mut chars = text.chars().peekable();

  while let Some(ch) = chars.next() {
    if in_quotes {
      if ch == '"' {
        if chars.peek() == Some(&'"') {
          buf.push('"');
          chars.next();
        } else {
          in_quotes = false;
        }
      } else {
        buf.push(ch);
      }
      continue;
    }
    match ch {
      // a quote only opens quoting at the start of a field
      '"' if buf.is_empty() => in_quotes = true,
      ',' => record.push(std::mem::take(&mut buf)),
      '\r' => {}
      '\n' => {
        record.push(std::mem::take(&mut buf));
        records.push(std::mem::take(&mut record));
      }
      _ => buf.push(ch),
    }
  }
  if !buf.is_empty() || !record.is_empty() {
    record.push(buf);
    records.push(record);
  }
  // blank lines come through as a single empty field
  records.retain(|r| !(r.len() == 1 && r[0].trim().is_empty()));
  records
}

/// Log-safe truncation for large strings.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut end = max;
  while !s.is_char_boundary(end) {
    end -= 1;
  }
  format!("{}… ({} bytes total)", &s[..end], s.len())
}
