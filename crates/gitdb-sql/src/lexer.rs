//! Batch splitting: a statement batch is split on `;`, trimming and
//! discarding empty fragments (§4.8).

/// Split a semicolon-separated batch into trimmed, non-empty statement
/// fragments. A `;` inside a quoted literal does not split the batch.
pub fn split_batch(batch: &str) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in batch.chars() {
        match quote {
            Some(q) if ch == q => {
                quote = None;
                current.push(ch);
            }
            Some(_) => current.push(ch),
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                ';' => {
                    fragments.push(current.trim().to_string());
                    current.clear();
                }
                _ => current.push(ch),
            },
        }
    }
    if !current.trim().is_empty() {
        fragments.push(current.trim().to_string());
    }
    fragments.into_iter().filter(|f| !f.is_empty()).collect()
}
