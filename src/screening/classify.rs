use serde::{Deserialize, Serialize};

/// Leak disclosures. Matched on the whole list name.
const AMBER_LISTS: &[&str] = &[
    "PARADISE PAPERS",
    "PANAMA PAPERS",
    "BAHAMAS LEAKS",
    "BOLETIN PANAMA PAPERS",
    "OFFSHORE LEAKS",
];

/// Government, judicial and electoral roles. Matched anywhere in the list name.
const PEP_KEYWORDS: &[&str] = &[
    "PEP",
    "GOBIERNO",
    "CONSEJO",
    "CORTE",
    "EMBAJADAS",
    "MINISTERIO",
    "PRESIDENCIA",
    "SENADO",
    "CAMARA",
    "ASAMBLEA",
    "ALCALDIAS",
    "CONCEJOS",
    "NOTARIAS",
    "SIGEP",
    "ELECTORAL",
    "JUDICATURA",
    "CANDIDATOS",
    "PARTIDOS",
];

/// Risk tier of a watchlist hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "Rojo")]
    Red,
    #[serde(rename = "Amarillo")]
    Amber,
    #[serde(rename = "PEP's")]
    Pep,
    #[serde(rename = "No Clasificado")]
    Unclassified,
}

impl Classification {
    pub const TIERS: [Classification; 3] =
        [Classification::Red, Classification::Amber, Classification::Pep];

    /// Label stored in `records.classification`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Red => "Rojo",
            Classification::Amber => "Amarillo",
            Classification::Pep => "PEP's",
            Classification::Unclassified => "No Clasificado",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label {
            "Rojo" => Classification::Red,
            "Amarillo" => Classification::Amber,
            "PEP's" => Classification::Pep,
            _ => Classification::Unclassified,
        }
    }

    /// CSS class used by the templates.
    pub fn css(&self) -> &'static str {
        match self {
            Classification::Red => "tier-red",
            Classification::Amber => "tier-amber",
            Classification::Pep => "tier-pep",
            Classification::Unclassified => "tier-none",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed rule tables a list type is checked against.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationRules<'a> {
    /// Compared against the whole upper-cased list type.
    pub amber_lists: &'a [&'a str],
    /// Looked for anywhere in the upper-cased list type.
    pub pep_keywords: &'a [&'a str],
}

impl ClassificationRules<'static> {
    pub const DEFAULT: ClassificationRules<'static> = ClassificationRules {
        amber_lists: AMBER_LISTS,
        pep_keywords: PEP_KEYWORDS,
    };
}

/// Classify a provider list type with the default rules.
pub fn classify(list_type: Option<&str>) -> Classification {
    classify_with(&ClassificationRules::DEFAULT, list_type)
}

/// Amber is checked before PEP; anything non-empty that matches neither is red.
pub fn classify_with(rules: &ClassificationRules<'_>, list_type: Option<&str>) -> Classification {
    let Some(list_type) = list_type.filter(|s| !s.is_empty()) else {
        return Classification::Unclassified;
    };

    let upper = list_type.to_uppercase();

    if rules.amber_lists.iter().any(|list| *list == upper) {
        return Classification::Amber;
    }

    if rules.pep_keywords.iter().any(|kw| upper.contains(kw)) {
        return Classification::Pep;
    }

    Classification::Red
}
