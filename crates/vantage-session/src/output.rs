use std::net::IpAddr;
use std::path::Path;

use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// One resolved address, as recorded alongside a resolved FQDN.
#[derive(Clone, Debug, Serialize)]
pub struct AddressRecord {
    pub ip: IpAddr,
    pub cidr: Option<String>,
    pub asn: Option<u32>,
    pub desc: Option<String>,
}

/// One line of `amass.json`: a resolved FQDN and its addresses/sources.
#[derive(Clone, Debug, Serialize)]
pub struct FqdnRecord {
    pub name: String,
    pub domain: String,
    pub addresses: Vec<AddressRecord>,
    pub tag: String,
    pub sources: Vec<String>,
}

/// Appends one JSON-encoded record per line to `amass.json`, per the
/// persisted-state section of the external interfaces. Records are written
/// incrementally as each FQDN resolves, so a killed session leaves a
/// partially complete but valid file.
pub struct OutputWriter {
    file: Mutex<tokio::fs::File>,
}

impl OutputWriter {
    pub async fn create(path: &Path) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(OutputWriter {
            file: Mutex::new(file),
        })
    }

    pub async fn write_fqdn(&self, record: &FqdnRecord) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_one_json_line_per_record() {
        let dir = std::env::temp_dir().join(format!("vantage-output-test-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("amass.json");

        let writer = OutputWriter::create(&path).await.unwrap();
        writer
            .write_fqdn(&FqdnRecord {
                name: "example.com".into(),
                domain: "example.com".into(),
                addresses: vec![AddressRecord {
                    ip: "93.184.216.34".parse().unwrap(),
                    cidr: Some("93.184.216.0/24".into()),
                    asn: Some(15133),
                    desc: None,
                }],
                tag: "dns".into(),
                sources: vec!["dns".into()],
            })
            .await
            .unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("\"example.com\""));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
