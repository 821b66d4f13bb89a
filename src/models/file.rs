use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One file row as the remote store serializes it. `size` stays the decimal
/// megabyte string the server sends; arithmetic parses it on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub size: String,
    pub timestamp: DateTime<Utc>,
    pub extension: String,
}

impl FileRecord {
    /// Placeholder inserted ahead of remote confirmation. The synthesized id
    /// is only valid until the next authoritative load replaces it.
    pub fn placeholder(username: &str, name: &str, size_mb: f64, now: DateTime<Utc>) -> Self {
        FileRecord {
            id: format!("{}-{}-{}", username, name, now.timestamp_millis()),
            name: name.to_string(),
            size: format!("{:.2}", size_mb),
            timestamp: now,
            extension: extension_label(name),
        }
    }

    pub fn size_mb(&self) -> f64 {
        self.size.parse().unwrap_or(0.0)
    }
}

/// Uppercased final name segment, `FILE` when there is no extension.
pub fn extension_label(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_uppercase(),
        _ => "FILE".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_synthesizes_id_and_extension() {
        let now = Utc::now();
        let rec = FileRecord::placeholder("alice", "report.pdf", 50.0, now);
        assert_eq!(
            rec.id,
            format!("alice-report.pdf-{}", now.timestamp_millis())
        );
        assert_eq!(rec.name, "report.pdf");
        assert_eq!(rec.size, "50.00");
        assert_eq!(rec.extension, "PDF");
    }

    #[test]
    fn extension_label_handles_dotless_names() {
        assert_eq!(extension_label("notes"), "FILE");
        assert_eq!(extension_label("archive.tar.gz"), "GZ");
        assert_eq!(extension_label("trailing."), "FILE");
    }

    #[test]
    fn size_parses_back_to_float() {
        let rec = FileRecord::placeholder("bob", "a.bin", 12.5, Utc::now());
        assert_eq!(rec.size_mb(), 12.5);
    }
}
