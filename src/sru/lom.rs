//! LOM record-schema parser for SRW responses.

use super::response::{Classification, TaxonEntry};
use super::xml::XmlElement;
use super::RecordParser;

/// Field-name to element-path mapping for the LOM record schema.
const LOM_FIELD_PATHS: &[(&str, &str)] = &[
    ("id", ".//general/identifier/entry"),
    ("catalog", ".//general/identifier/catalog"),
    ("title", ".//general/title/string"),
    ("description", ".//general/description/string"),
    ("format", ".//technical/format"),
    ("technical_location", ".//technical/location"),
    ("type", ".//educational/learningResourceType/value"),
];

/// The shipped [`RecordParser`] for the `lom` record schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct LomRecordParser;

impl LomRecordParser {
    /// Creates the LOM parser.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RecordParser for LomRecordParser {
    fn record_schema(&self) -> &'static str {
        "lom"
    }

    fn field_paths(&self) -> &[(&'static str, &'static str)] {
        LOM_FIELD_PATHS
    }

    fn classifications(&self, record: &XmlElement) -> Vec<Classification> {
        let mut classifications = Vec::new();
        for taxon_path in record.find_all(".//classification/taxonPath") {
            let Some(source) = taxon_path.get_text(".//source/string", false) else {
                continue;
            };
            let taxa: Vec<TaxonEntry> = taxon_path
                .find_all(".//taxon")
                .into_iter()
                .map(|taxon| TaxonEntry {
                    ref_id: taxon.get_text(".//id", false).map(|text| text.first().to_string()),
                    name: taxon
                        .get_text(".//entry/string", false)
                        .map(|text| text.first().to_string()),
                })
                .collect();
            if taxa.is_empty() {
                continue;
            }
            classifications.push(Classification {
                source: source.first().to_string(),
                taxa,
            });
        }
        classifications
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sru::XmlDocument;

    const RECORD: &str = r#"
        <record>
            <lom xmlns="http://example.org/LOM">
                <general>
                    <identifier><catalog>cat</catalog><entry>e-1</entry></identifier>
                    <title><string>Bird Atlas</string></title>
                </general>
                <classification>
                    <taxonPath>
                        <source><string>aves</string></source>
                        <taxon><id>A1</id><entry><string>Raptors</string></entry></taxon>
                        <taxon><id>A2</id><entry><string>Owls</string></entry></taxon>
                    </taxonPath>
                    <taxonPath>
                        <source><string>habitats</string></source>
                        <taxon><id>H9</id><entry><string>Wetland</string></entry></taxon>
                    </taxonPath>
                </classification>
            </lom>
        </record>"#;

    #[test]
    fn test_field_paths_extract_title() {
        let doc = XmlDocument::parse(RECORD).unwrap();
        let record = doc.root().find("record").unwrap();
        let parser = LomRecordParser::new();
        let (_, title_path) = parser
            .field_paths()
            .iter()
            .find(|(field, _)| *field == "title")
            .unwrap();
        assert_eq!(record.get_text(title_path, false).unwrap().first(), "Bird Atlas");
    }

    #[test]
    fn test_classifications_grouped_by_source() {
        let doc = XmlDocument::parse(RECORD).unwrap();
        let record = doc.root().find("record").unwrap();
        let classifications = LomRecordParser::new().classifications(record);
        assert_eq!(classifications.len(), 2);
        assert_eq!(classifications[0].source, "aves");
        assert_eq!(classifications[0].taxa.len(), 2);
        assert_eq!(classifications[0].taxa[0].ref_id.as_deref(), Some("A1"));
        assert_eq!(classifications[1].source, "habitats");
        assert_eq!(classifications[1].taxa[0].name.as_deref(), Some("Wetland"));
    }

    #[test]
    fn test_taxon_path_without_source_is_skipped() {
        let xml = r"
            <record><lom><classification><taxonPath>
                <taxon><id>X</id></taxon>
            </taxonPath></classification></lom></record>";
        let doc = XmlDocument::parse(xml).unwrap();
        let record = doc.root().find("record").unwrap();
        assert!(LomRecordParser::new().classifications(record).is_empty());
    }
}
