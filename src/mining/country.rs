//! Country of study from free text.
//!
//! Resolution order: a [`Gazetteer`] over the case-preserved text, then
//! American country names, their gentilics and finally broad regions, all
//! matched on lowercased text.

use regex::Regex;
use std::sync::OnceLock;

/// Detects country mentions in text
pub trait Gazetteer: Send + Sync {
    /// Countries mentioned in `text`, in order of first appearance
    fn countries(&self, text: &str) -> Vec<String>;
}

/// English short names of the world's countries
const WORLD_COUNTRIES: &[&str] = &[
    "Afghanistan", "Albania", "Algeria", "Andorra", "Angola", "Antigua and Barbuda",
    "Argentina", "Armenia", "Australia", "Austria", "Azerbaijan", "Bahamas", "Bahrain",
    "Bangladesh", "Barbados", "Belarus", "Belgium", "Belize", "Benin", "Bhutan", "Bolivia",
    "Bosnia and Herzegovina", "Botswana", "Brazil", "Brunei", "Bulgaria", "Burkina Faso",
    "Burundi", "Cambodia", "Cameroon", "Canada", "Cape Verde", "Central African Republic",
    "Chad", "Chile", "China", "Colombia", "Comoros", "Congo", "Costa Rica", "Croatia",
    "Cuba", "Cyprus", "Czech Republic", "Denmark", "Djibouti", "Dominica",
    "Dominican Republic", "Ecuador", "Egypt", "El Salvador", "Equatorial Guinea",
    "Eritrea", "Estonia", "Eswatini", "Ethiopia", "Fiji", "Finland", "France",
    "French Guiana", "Gabon", "Gambia", "Georgia", "Germany", "Ghana", "Greece", "Grenada",
    "Guatemala", "Guinea", "Guinea-Bissau", "Guyana", "Haiti", "Honduras", "Hong Kong",
    "Hungary", "Iceland", "India", "Indonesia", "Iran", "Iraq", "Ireland", "Israel", "Italy",
    "Ivory Coast", "Jamaica", "Japan", "Jordan", "Kazakhstan", "Kenya", "Kiribati", "Kosovo",
    "Kuwait", "Kyrgyzstan", "Laos", "Latvia", "Lebanon", "Lesotho", "Liberia", "Libya",
    "Liechtenstein", "Lithuania", "Luxembourg", "Madagascar", "Malawi", "Malaysia",
    "Maldives", "Mali", "Malta", "Marshall Islands", "Mauritania", "Mauritius", "Mexico",
    "Micronesia", "Moldova", "Monaco", "Mongolia", "Montenegro", "Morocco", "Mozambique",
    "Myanmar", "Namibia", "Nauru", "Nepal", "Netherlands", "New Zealand", "Nicaragua",
    "Niger", "Nigeria", "North Korea", "North Macedonia", "Norway", "Oman", "Pakistan",
    "Palau", "Palestine", "Panama", "Papua New Guinea", "Paraguay", "Peru", "Philippines",
    "Poland", "Portugal", "Puerto Rico", "Qatar", "Romania", "Russia", "Rwanda",
    "Saint Kitts and Nevis", "Saint Lucia", "Saint Vincent and the Grenadines", "Samoa",
    "San Marino", "Sao Tome and Principe", "Saudi Arabia", "Senegal", "Serbia",
    "Seychelles", "Sierra Leone", "Singapore", "Slovakia", "Slovenia", "Solomon Islands",
    "Somalia", "South Africa", "South Korea", "South Sudan", "Spain", "Sri Lanka", "Sudan",
    "Suriname", "Sweden", "Switzerland", "Syria", "Taiwan", "Tajikistan", "Tanzania",
    "Thailand", "Timor-Leste", "Togo", "Tonga", "Trinidad and Tobago", "Tunisia", "Turkey",
    "Turkmenistan", "Tuvalu", "Uganda", "Ukraine", "United Arab Emirates", "United Kingdom",
    "United States", "Uruguay", "Uzbekistan", "Vanuatu", "Venezuela", "Vietnam", "Yemen",
    "Zambia", "Zimbabwe",
];

/// Gazetteer over [`WORLD_COUNTRIES`]: capitalized names on word boundaries
#[derive(Debug, Default, Clone, Copy)]
pub struct WorldGazetteer;

impl WorldGazetteer {
    fn pattern() -> &'static Regex {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        PATTERN.get_or_init(|| {
            // Longest names first so "Dominican Republic" wins over "Dominica"
            let mut names = WORLD_COUNTRIES.to_vec();
            names.sort_by_key(|name| std::cmp::Reverse(name.len()));
            let alternation = names
                .iter()
                .map(|name| regex::escape(name))
                .collect::<Vec<_>>()
                .join("|");
            Regex::new(&format!(r"\b(?:{alternation})\b")).expect("valid country pattern")
        })
    }
}

impl Gazetteer for WorldGazetteer {
    fn countries(&self, text: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for m in Self::pattern().find_iter(text) {
            if !found.iter().any(|country| country == m.as_str()) {
                found.push(m.as_str().to_string());
            }
        }
        found
    }
}

/// American countries with their English and Spanish gentilics
pub const AMERICAN_GENTILICS: &[(&str, &[&str])] = &[
    ("Argentina", &["argentinian", "argentinians", "argentino", "argentina", "argentinos"]),
    ("Bolivia", &["bolivian", "bolivians", "boliviano", "boliviana", "bolivianos"]),
    ("Brazil", &["brazilian", "brazilians", "brasilero", "brasilera", "brasileño", "brasileños"]),
    ("Chile", &["chilean", "chileans", "chileno", "chilena", "chilenos"]),
    ("Colombia", &["colombian", "colombians", "colombiano", "colombiana", "colombianos"]),
    ("Ecuador", &["ecuadorian", "ecuadorians", "ecuatoriano", "ecuatoriana", "ecuatorianos"]),
    ("Guyana", &["guyanese"]),
    ("Paraguay", &["paraguayan", "paraguayans", "paraguayo", "paraguaya", "paraguayos"]),
    ("Peru", &["peruvian", "peruvians", "peruano", "peruana", "peruanos"]),
    ("Suriname", &["surinamese"]),
    ("Uruguay", &["uruguayan", "uruguayans", "uruguayo", "uruguaya", "uruguayos"]),
    ("Venezuela", &["venezuelan", "venezuelans", "venezolano", "venezolana", "venezolanos"]),
    ("Mexico", &["mexican", "mexicans", "mexicano", "mexicana", "mexicanos"]),
    ("Guatemala", &["guatemalan", "guatemalans", "guatemalteco", "guatemalteca", "guatemaltecos"]),
    ("Honduras", &["honduran", "hondurans", "hondureño", "hondureña", "hondureños"]),
    (
        "El Salvador",
        &["salvadoran", "salvadorans", "salvadorean", "salvadorian", "salvadoreño", "salvadoreña", "salvadoreños"],
    ),
    ("Nicaragua", &["nicaraguan", "nicaraguans", "nicaragüense", "nicaraguenses"]),
    ("Costa Rica", &["costa rican", "costa ricans", "costarricense", "tico", "tica", "ticos"]),
    ("Panama", &["panamanian", "panamanians", "panameño", "panameña", "panameños"]),
    ("Belize", &["belizean", "belizeans"]),
    ("Cuba", &["cuban", "cubans", "cubano", "cubana", "cubanos"]),
    ("Dominican Republic", &["dominican", "dominicans", "dominicano", "dominicana", "dominicanos"]),
    ("Haiti", &["haitian", "haitians", "haitiano"]),
    ("Jamaica", &["jamaican", "jamaicans"]),
    ("Puerto Rico", &["puerto rican", "puerto ricans", "puertorriqueño", "boricua", "boricuas"]),
    ("Trinidad and Tobago", &["trinidadian", "tobagonian"]),
    ("Barbados", &["barbadian"]),
    ("Bahamas", &["bahamian"]),
    ("Grenada", &["grenadian"]),
    ("Saint Lucia", &["saint lucian"]),
    ("Saint Vincent and the Grenadines", &["vincentian"]),
    ("Antigua and Barbuda", &["antiguan", "barbudan"]),
    ("Dominica", &["dominicant (caribe)"]),
    ("United States", &["american", "americans", "estadounidense", "norteamericano"]),
    ("Canada", &["canadian", "canadians"]),
    ("French Guiana", &["french guianese"]),
];

/// Broad regions reported when no country is named
pub const REGIONS: &[(&str, &str)] = &[
    ("latin america", "Latin America"),
    ("south america", "South America"),
    ("central america", "Central America"),
    ("north america", "North America"),
    ("caribbean", "Caribbean"),
];

/// Country (or region) a text refers to; empty when none is found
#[must_use]
pub fn extraer_pais(gazetteer: &dyn Gazetteer, text: &str) -> String {
    if let Some(country) = gazetteer.countries(text).into_iter().next() {
        return country;
    }

    let lowered = text.to_lowercase();

    if let Some((country, _)) = AMERICAN_GENTILICS
        .iter()
        .find(|(country, _)| lowered.contains(&country.to_lowercase()))
    {
        return (*country).to_string();
    }

    if let Some((country, _)) = AMERICAN_GENTILICS
        .iter()
        .find(|(_, gentilics)| gentilics.iter().any(|g| lowered.contains(g)))
    {
        return (*country).to_string();
    }

    REGIONS
        .iter()
        .find(|(needle, _)| lowered.contains(needle))
        .map(|(_, region)| (*region).to_string())
        .unwrap_or_default()
}
