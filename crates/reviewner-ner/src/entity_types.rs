//! Entity type classification and normalization.

use std::collections::HashMap;

/// Normalized entity type, OntoNotes categories plus CoNLL's MISC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum EntityType {
    Person,
    Norp,
    Facility,
    Organization,
    Gpe,
    Location,
    Product,
    Event,
    WorkOfArt,
    Law,
    Language,
    Date,
    Time,
    Percent,
    Money,
    Quantity,
    Ordinal,
    Cardinal,
    Misc,
    Other,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Person => "PERSON",
            EntityType::Norp => "NORP",
            EntityType::Facility => "FAC",
            EntityType::Organization => "ORG",
            EntityType::Gpe => "GPE",
            EntityType::Location => "LOC",
            EntityType::Product => "PRODUCT",
            EntityType::Event => "EVENT",
            EntityType::WorkOfArt => "WORK_OF_ART",
            EntityType::Law => "LAW",
            EntityType::Language => "LANGUAGE",
            EntityType::Date => "DATE",
            EntityType::Time => "TIME",
            EntityType::Percent => "PERCENT",
            EntityType::Money => "MONEY",
            EntityType::Quantity => "QUANTITY",
            EntityType::Ordinal => "ORDINAL",
            EntityType::Cardinal => "CARDINAL",
            EntityType::Misc => "MISC",
            EntityType::Other => "OTHER",
        }
    }

    /// Highlight colour used by the entity visualizer.
    pub fn default_color(&self) -> &'static str {
        match self {
            EntityType::Organization => "#7aecec",
            EntityType::Product => "#bfeeb7",
            EntityType::Gpe => "#feca74",
            EntityType::Location => "#ff9561",
            EntityType::Person => "#aa9cfc",
            EntityType::Norp => "#c887fb",
            EntityType::Facility => "#9cc9cc",
            EntityType::Event => "#ffeb80",
            EntityType::Law | EntityType::Language => "#ff8197",
            EntityType::WorkOfArt => "#f0d0ff",
            EntityType::Date | EntityType::Time => "#bfe1d9",
            EntityType::Money
            | EntityType::Quantity
            | EntityType::Ordinal
            | EntityType::Cardinal
            | EntityType::Percent => "#e4e7d2",
            EntityType::Misc | EntityType::Other => "#ddd",
        }
    }
}

// Map model-specific labels to normalized types
fn get_label_map() -> &'static HashMap<&'static str, EntityType> {
    use std::sync::OnceLock;
    static LABEL_MAP: OnceLock<HashMap<&'static str, EntityType>> = OnceLock::new();
    LABEL_MAP.get_or_init(|| {
        let mut m = HashMap::new();

        // OntoNotes labels
        m.insert("PERSON", EntityType::Person);
        m.insert("NORP", EntityType::Norp);
        m.insert("FAC", EntityType::Facility);
        m.insert("FACILITY", EntityType::Facility);
        m.insert("ORG", EntityType::Organization);
        m.insert("GPE", EntityType::Gpe);
        m.insert("LOC", EntityType::Location);
        m.insert("PRODUCT", EntityType::Product);
        m.insert("EVENT", EntityType::Event);
        m.insert("WORK_OF_ART", EntityType::WorkOfArt);
        m.insert("LAW", EntityType::Law);
        m.insert("LANGUAGE", EntityType::Language);
        m.insert("DATE", EntityType::Date);
        m.insert("TIME", EntityType::Time);
        m.insert("PERCENT", EntityType::Percent);
        m.insert("MONEY", EntityType::Money);
        m.insert("QUANTITY", EntityType::Quantity);
        m.insert("ORDINAL", EntityType::Ordinal);
        m.insert("CARDINAL", EntityType::Cardinal);

        // CoNLL labels
        m.insert("PER", EntityType::Person);
        m.insert("ORGANIZATION", EntityType::Organization);
        m.insert("LOCATION", EntityType::Location);
        m.insert("MISC", EntityType::Misc);

        m
    })
}

/// Normalize a model-specific entity label to our standard EntityType.
pub fn normalize_entity_label(label: &str) -> EntityType {
    let clean_label = crate::decode::split_tag(label).1;
    let upper = clean_label.to_ascii_uppercase();

    get_label_map()
        .get(upper.as_str())
        .copied()
        .unwrap_or(EntityType::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ontonotes_labels() {
        assert_eq!(normalize_entity_label("ORG"), EntityType::Organization);
        assert_eq!(normalize_entity_label("GPE"), EntityType::Gpe);
        assert_eq!(normalize_entity_label("WORK_OF_ART"), EntityType::WorkOfArt);
        assert_eq!(normalize_entity_label("CARDINAL"), EntityType::Cardinal);
    }

    #[test]
    fn test_normalize_conll_and_tagged_labels() {
        assert_eq!(normalize_entity_label("PER"), EntityType::Person);
        assert_eq!(normalize_entity_label("B-PER"), EntityType::Person);
        assert_eq!(normalize_entity_label("U-ORG"), EntityType::Organization);
        assert_eq!(normalize_entity_label("I-LOC"), EntityType::Location);
        assert_eq!(normalize_entity_label("misc"), EntityType::Misc);
    }

    #[test]
    fn test_unknown_labels_are_other() {
        assert_eq!(normalize_entity_label("BRAND_FEELING"), EntityType::Other);
        assert_eq!(EntityType::Other.default_color(), "#ddd");
    }

    #[test]
    fn test_colors_follow_type() {
        assert_eq!(EntityType::Organization.default_color(), "#7aecec");
        assert_eq!(EntityType::Person.default_color(), "#aa9cfc");
        assert_eq!(EntityType::Money.default_color(), EntityType::Cardinal.default_color());
    }
}
