const MAX_ID_LEN: usize = 64;

/// File name for a job's result spreadsheet: `jd_extraction_{id}.xlsx`.
///
/// Request ids come from the service, so anything outside `[A-Za-z0-9_-]` is
/// replaced before the id touches the filesystem.
pub fn artifact_filename(request_id: &str) -> String {
    format!("jd_extraction_{}.xlsx", sanitize_id(request_id))
}

fn sanitize_id(input: &str) -> String {
    let mut cleaned = String::with_capacity(input.len());
    let mut prev_underscore = false;
    for c in input.trim().chars() {
        let c = if c.is_ascii_alphanumeric() || c == '-' {
            c
        } else {
            '_'
        };
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        cleaned.push(c);
    }
    let mut cleaned = cleaned.trim_matches('_').to_string();
    cleaned.truncate(MAX_ID_LEN);
    if cleaned.is_empty() {
        cleaned.push_str("unknown");
    }
    cleaned
}
