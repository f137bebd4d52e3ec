//! JSON export of discovered documents

use crate::model::{Discovery, DocumentRef};
use crate::output::OutputResult;
use serde::Serialize;

/// Pretty-printed JSON of a whole discovery tree
pub fn format_discovery_json(discovery: &Discovery) -> OutputResult<String> {
    to_json(discovery)
}

/// Pretty-printed JSON array of documents
pub fn format_documents_json(documents: &[DocumentRef]) -> OutputResult<String> {
    to_json(documents)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> OutputResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProcedureListing, ProcedureRef, ProjectListing, ProjectRef};
    use serde_json::Value;

    fn sample_document() -> DocumentRef {
        DocumentRef {
            title: "Relazione \"tecnica\"".to_string(),
            date: "12/03/2021".to_string(),
            ..DocumentRef::new("https://va.mite.gov.it/File/Documento/42")
        }
    }

    #[test]
    fn test_discovery_json_keeps_hierarchy() {
        let mut discovery = Discovery::new("eolico");
        discovery.projects.push(ProjectListing {
            project: ProjectRef {
                url: "https://va.mite.gov.it/it-IT/Oggetti/Info/1".to_string(),
            },
            procedures: vec![ProcedureListing {
                procedure: ProcedureRef {
                    url: "https://va.mite.gov.it/it-IT/Oggetti/Documentazione/1/10".to_string(),
                    project_url: "https://va.mite.gov.it/it-IT/Oggetti/Info/1".to_string(),
                },
                documents: vec![sample_document()],
                truncated: true,
            }],
        });

        let text = format_discovery_json(&discovery).unwrap();
        let json: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(json["keyword"], "eolico");
        assert_eq!(json["duplicates_skipped"], 0);
        let procedure = &json["projects"][0]["procedures"][0];
        assert_eq!(procedure["truncated"], true);
        assert_eq!(procedure["documents"][0]["title"], "Relazione \"tecnica\"");
        assert_eq!(procedure["documents"][0]["size"], "N/A");
        assert_eq!(procedure["documents"][0]["extension"], "pdf");
    }

    #[test]
    fn test_documents_json_is_array() {
        let json: Value =
            serde_json::from_str(&format_documents_json(&[sample_document()]).unwrap()).unwrap();
        assert_eq!(json.as_array().map(Vec::len), Some(1));
        assert_eq!(json[0]["date"], "12/03/2021");

        assert_eq!(format_documents_json(&[]).unwrap(), "[]");
    }
}
