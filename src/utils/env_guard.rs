use std::fs;
use std::path::Path;

/// Parse `.env` content into key/value pairs. Blank lines and `#` comments are skipped,
/// trailing comments are cut, and one level of matching quotes is removed.
pub fn parse_dot_env(content: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        let value = value.trim();
        let parsed = if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            &value[1..value.len() - 1]
        } else {
            value.split(" #").next().unwrap_or("").trim()
        };
        out.push((key.to_string(), parsed.to_string()));
    }
    out
}

/// Load `.env` from the working directory into the process environment. Variables that
/// are already set win over the file.
pub fn load_dot_env() {
    load_env_file(Path::new(".env"));
}

pub fn load_env_file(path: &Path) {
    if !path.exists() {
        return;
    }
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("failed to read {}: {}", path.display(), e);
            return;
        }
    };

    for (key, value) in parse_dot_env(&content) {
        if std::env::var_os(&key).is_some() {
            continue;
        }
        std::env::set_var(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::parse_dot_env;

    #[test]
    fn test_parse_dot_env_handles_quotes_comments_and_export() {
        let parsed = parse_dot_env(
            "# header\n\nRPC_URL=\"http://localhost:8545\"\nexport STORE_NAME=defi # trailing\nPRIVATE_KEY='0xabc'\nnot a pair\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("RPC_URL".to_string(), "http://localhost:8545".to_string()),
                ("STORE_NAME".to_string(), "defi".to_string()),
                ("PRIVATE_KEY".to_string(), "0xabc".to_string()),
            ]
        );
    }
}
