/// Resolve `raw` against `cwd` into absolute path components.
///
/// `~` expands to `home`. `.` and empty components vanish, and `..` pops
/// (never above `/`).
pub fn resolve(cwd: &str, home: &str, raw: &str) -> Vec<String> {
    let expanded = if raw == "~" {
        home.to_string()
    } else if let Some(rest) = raw.strip_prefix("~/") {
        format!("{}/{}", home, rest)
    } else {
        raw.to_string()
    };

    let mut parts = if expanded.starts_with('/') {
        Vec::new()
    } else {
        resolve("/", home, cwd)
    };
    for component in expanded.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            name => parts.push(name.to_string()),
        }
    }
    parts
}

pub fn display(parts: &[String]) -> String {
    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", parts.join("/"))
    }
}
