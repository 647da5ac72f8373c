use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use strum::EnumIter;

use crate::error::EnsGuardError;

pub type CategoryId = u32;

/// Short mnemonic identifying an ENS category.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum CategoryCode {
    /// Marco Organizativo
    Org,
    /// Marco Operacional
    Op,
    /// Medidas de Protección
    Mp,
}

impl CategoryCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryCode::Org => "org",
            CategoryCode::Op => "op",
            CategoryCode::Mp => "mp",
        }
    }
}

impl std::fmt::Display for CategoryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Requirement tier of a measure. Audits are run against one of these.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    #[default]
    Basic,
    Medium,
    High,
}

impl SecurityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityLevel::Basic => "basic",
            SecurityLevel::Medium => "medium",
            SecurityLevel::High => "high",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SecurityLevel::Basic => "Básico",
            SecurityLevel::Medium => "Medio",
            SecurityLevel::High => "Alto",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Some(SecurityLevel::Basic),
            "medium" => Some(SecurityLevel::Medium),
            "high" => Some(SecurityLevel::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub code: CategoryCode,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    pub id: String,
    pub category_id: CategoryId,
    pub code: String,
    pub name: String,
    pub description: String,
    pub basic_requirement: String,
    pub medium_requirement: String,
    pub high_requirement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guide_link: Option<String>,
}

impl Measure {
    pub fn requirement(&self, level: SecurityLevel) -> &str {
        match level {
            SecurityLevel::Basic => &self.basic_requirement,
            SecurityLevel::Medium => &self.medium_requirement,
            SecurityLevel::High => &self.high_requirement,
        }
    }
}

/// On-disk shape of a catalog definition
#[derive(Debug, Deserialize)]
struct CatalogDefinition {
    categories: Vec<Category>,
    measures: Vec<Measure>,
}

/// Read-only set of categories and measures.
///
/// Built once and never mutated. Construction checks integrity so every
/// downstream computation can rely on unique ids and valid category
/// references.
#[derive(Debug, Clone)]
pub struct Catalog {
    categories: Vec<Category>,
    measures: Vec<Measure>,
    measure_index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new(categories: Vec<Category>, measures: Vec<Measure>) -> Result<Self, EnsGuardError> {
        let mut category_ids = HashSet::new();
        let mut category_codes = HashSet::new();
        for category in &categories {
            if !category_ids.insert(category.id) {
                return Err(EnsGuardError::CatalogIntegrity(format!(
                    "duplicate category id {}",
                    category.id
                )));
            }
            if !category_codes.insert(category.code) {
                return Err(EnsGuardError::CatalogIntegrity(format!(
                    "duplicate category code '{}'",
                    category.code
                )));
            }
        }

        let mut measure_index = HashMap::with_capacity(measures.len());
        for (pos, measure) in measures.iter().enumerate() {
            if !category_ids.contains(&measure.category_id) {
                return Err(EnsGuardError::CatalogIntegrity(format!(
                    "measure '{}' references missing category {}",
                    measure.id, measure.category_id
                )));
            }
            if measure_index.insert(measure.id.clone(), pos).is_some() {
                return Err(EnsGuardError::CatalogIntegrity(format!(
                    "duplicate measure id '{}'",
                    measure.id
                )));
            }
        }

        debug!(
            "Catalog built: {} categories, {} measures",
            categories.len(),
            measures.len()
        );

        Ok(Catalog {
            categories,
            measures,
            measure_index,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, EnsGuardError> {
        let definition: CatalogDefinition = serde_json::from_str(json)?;
        Self::new(definition.categories, definition.measures)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, EnsGuardError> {
        info!("Loading catalog from {}", path.display());
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    pub fn category_by_code(&self, code: CategoryCode) -> Option<&Category> {
        self.categories.iter().find(|category| category.code == code)
    }

    pub fn measure(&self, id: &str) -> Option<&Measure> {
        self.measure_index.get(id).map(|&pos| &self.measures[pos])
    }

    pub fn contains_measure(&self, id: &str) -> bool {
        self.measure_index.contains_key(id)
    }

    pub fn measure_ids(&self) -> HashSet<String> {
        self.measure_index.keys().cloned().collect()
    }

    /// Measures of one category, in catalog order
    pub fn measures_in(&self, category_id: CategoryId) -> impl Iterator<Item = &Measure> + '_ {
        self.measures
            .iter()
            .filter(move |measure| measure.category_id == category_id)
    }

    /// The ENS catalog shipped with the application
    pub fn builtin() -> Result<Self, EnsGuardError> {
        Self::new(builtin_categories(), builtin_measures())
    }
}

const CCN_GUIDE: &str = "https://www.ccn-cert.cni.es/series-ccn-stic/800-guia-esquema-nacional-de-seguridad/item/download/476_f8d7f6a1b7c5e1a0d4c8f9e2b3a6c7d8.html";

fn builtin_categories() -> Vec<Category> {
    vec![
        Category {
            id: 1,
            code: CategoryCode::Org,
            name: "Marco Organizativo".into(),
            description: "Políticas, normativa y procedimientos de seguridad".into(),
        },
        Category {
            id: 2,
            code: CategoryCode::Op,
            name: "Marco Operacional".into(),
            description: "Planificación, control de acceso y explotación".into(),
        },
        Category {
            id: 3,
            code: CategoryCode::Mp,
            name: "Medidas de Protección".into(),
            description: "Protección de instalaciones, personal y equipos".into(),
        },
    ]
}

fn measure(
    id: &str,
    category_id: CategoryId,
    name: &str,
    description: &str,
    requirements: [&str; 3],
) -> Measure {
    let [basic, medium, high] = requirements;
    Measure {
        id: id.to_owned(),
        category_id,
        code: id.to_owned(),
        name: name.to_owned(),
        description: description.to_owned(),
        basic_requirement: basic.to_owned(),
        medium_requirement: medium.to_owned(),
        high_requirement: high.to_owned(),
        guide_link: Some(CCN_GUIDE.to_owned()),
    }
}

fn builtin_measures() -> Vec<Measure> {
    vec![
        measure(
            "org.1",
            1,
            "Política de Seguridad",
            "La organización aprobará una política de seguridad de la información que contemple las directrices de seguridad que deben cumplir los sistemas de información.",
            [
                "La normativa de seguridad estará disponible en la organización.",
                "Además del nivel BAJO, la política será comunicada a todos los miembros de la organización.",
                "Además del nivel MEDIO, se requerirá reconocimiento formal de su conocimiento.",
            ],
        ),
        measure(
            "org.2",
            1,
            "Normativa de Seguridad",
            "La organización desarrollará una normativa de seguridad que concrete la política de seguridad.",
            [
                "Existirá normativa de seguridad que concrete la política.",
                "Además del nivel BAJO, se revisará periódicamente.",
                "Además del nivel MEDIO, se mantendrá un control de versiones.",
            ],
        ),
        measure(
            "org.3",
            1,
            "Procedimientos de Seguridad",
            "Se elaborarán procedimientos que desarrollen la normativa de seguridad.",
            [
                "Existirán procedimientos que desarrollen la normativa.",
                "Además del nivel BAJO, estarán documentados y actualizados.",
                "Además del nivel MEDIO, se verificará su cumplimiento.",
            ],
        ),
        measure(
            "org.4",
            1,
            "Proceso de Autorización",
            "Se establecerá un proceso de autorización de los sistemas de información.",
            [
                "Existirá un proceso de autorización documentado.",
                "Además del nivel BAJO, incluirá análisis de riesgos.",
                "Además del nivel MEDIO, se realizará seguimiento continuo.",
            ],
        ),
        measure(
            "op.pl.1",
            2,
            "Análisis de Riesgos",
            "Se realizará un análisis de riesgos de los sistemas de información.",
            [
                "Se realizará análisis de riesgos inicial.",
                "Además del nivel BAJO, se actualizará periódicamente.",
                "Además del nivel MEDIO, se realizará seguimiento continuo.",
            ],
        ),
        measure(
            "op.acc.1",
            2,
            "Identificación",
            "Los usuarios del sistema se identificarán de forma única.",
            [
                "Existirá identificación única de usuarios.",
                "Además del nivel BAJO, se gestionarán las identidades.",
                "Además del nivel MEDIO, se verificará la identidad.",
            ],
        ),
        measure(
            "op.acc.2",
            2,
            "Autenticación",
            "Se verificará la identidad de los usuarios antes de permitir el acceso.",
            [
                "Existirán mecanismos de autenticación.",
                "Además del nivel BAJO, se usarán mecanismos robustos.",
                "Además del nivel MEDIO, se implementará autenticación multifactor.",
            ],
        ),
        measure(
            "mp.if.1",
            3,
            "Áreas Seguras",
            "Se establecerán áreas seguras para proteger las instalaciones.",
            [
                "Existirán controles de acceso físico.",
                "Además del nivel BAJO, se definirán perímetros de seguridad.",
                "Además del nivel MEDIO, se implementará control de acceso avanzado.",
            ],
        ),
        measure(
            "mp.per.1",
            3,
            "Caracterización del Personal",
            "Se definirán los roles y responsabilidades del personal.",
            [
                "Se definirán roles básicos de seguridad.",
                "Además del nivel BAJO, se documentarán responsabilidades.",
                "Además del nivel MEDIO, se verificarán antecedentes.",
            ],
        ),
        measure(
            "mp.eq.1",
            3,
            "Puesto de Trabajo",
            "Se protegerán los puestos de trabajo.",
            [
                "Existirán medidas básicas de protección.",
                "Además del nivel BAJO, se implementarán controles adicionales.",
                "Además del nivel MEDIO, se realizará monitorización.",
            ],
        ),
    ]
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Small catalog used across the crate's tests: category 1 has three
    /// measures, category 2 has one, category 3 is empty.
    pub(crate) fn sample_catalog() -> Catalog {
        let categories = vec![
            Category {
                id: 1,
                code: CategoryCode::Org,
                name: "Org".into(),
                description: String::new(),
            },
            Category {
                id: 2,
                code: CategoryCode::Op,
                name: "Op".into(),
                description: String::new(),
            },
            Category {
                id: 3,
                code: CategoryCode::Mp,
                name: "Mp".into(),
                description: String::new(),
            },
        ];
        let measures = vec![
            measure("org.1", 1, "Política de Seguridad", "Política aprobada", ["b", "m", "h"]),
            measure("org.2", 1, "Normativa", "Normativa que concreta", ["b", "m", "h"]),
            measure("org.3", 1, "Procedimientos", "Procedimientos escritos", ["b", "m", "h"]),
            measure("op.acc.1", 2, "Identificación", "Usuarios únicos", ["b", "m", "h"]),
        ];
        Catalog::new(categories, measures).unwrap()
    }

    #[test]
    fn test_builtin_catalog_shape() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.categories().len(), 3);
        assert_eq!(catalog.measures().len(), 10);
        assert_eq!(catalog.measures_in(1).count(), 4);
        assert_eq!(catalog.measures_in(2).count(), 3);
        assert_eq!(catalog.measures_in(3).count(), 3);
        assert_eq!(catalog.measures()[0].id, "org.1");
        assert_eq!(catalog.measures()[9].id, "mp.eq.1");
    }

    #[test]
    fn test_builtin_codes_match_ids() {
        let catalog = Catalog::builtin().unwrap();
        for measure in catalog.measures() {
            assert_eq!(measure.code, measure.id);
            let category = catalog.category(measure.category_id).unwrap();
            assert!(measure.id.starts_with(category.code.as_str()));
        }
    }

    #[test]
    fn test_lookup() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.measure("op.acc.2").unwrap().name, "Autenticación");
        assert!(catalog.measure("op.acc.9").is_none());
        assert_eq!(catalog.category_by_code(CategoryCode::Mp).unwrap().id, 3);
        assert!(catalog.contains_measure("mp.if.1"));
    }

    #[test]
    fn test_duplicate_measure_id_fails() {
        let mut measures = builtin_measures();
        measures.push(measures[0].clone());
        let err = Catalog::new(builtin_categories(), measures).unwrap_err();
        assert!(matches!(err, EnsGuardError::CatalogIntegrity(msg) if msg.contains("org.1")));
    }

    #[test]
    fn test_missing_category_fails() {
        let mut measures = builtin_measures();
        measures[3].category_id = 42;
        let err = Catalog::new(builtin_categories(), measures).unwrap_err();
        assert!(matches!(err, EnsGuardError::CatalogIntegrity(msg) if msg.contains("42")));
    }

    #[test]
    fn test_duplicate_category_code_fails() {
        let mut categories = builtin_categories();
        categories[2].code = CategoryCode::Org;
        let err = Catalog::new(categories, builtin_measures()).unwrap_err();
        assert!(matches!(err, EnsGuardError::CatalogIntegrity(_)));
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "categories": [
                {"id": 1, "code": "org", "name": "Org", "description": "d"}
            ],
            "measures": [
                {
                    "id": "org.1", "category_id": 1, "code": "org.1",
                    "name": "Política", "description": "d",
                    "basic_requirement": "b", "medium_requirement": "m",
                    "high_requirement": "h"
                }
            ]
        }"#;
        let catalog = Catalog::from_json(json).unwrap();
        assert_eq!(catalog.measures().len(), 1);
        assert_eq!(catalog.measure("org.1").unwrap().guide_link, None);
    }

    #[test]
    fn test_from_json_rejects_unknown_category_code() {
        let json = r#"{"categories": [{"id": 1, "code": "xx", "name": "", "description": ""}], "measures": []}"#;
        assert!(matches!(
            Catalog::from_json(json),
            Err(EnsGuardError::JsonError(_))
        ));
    }

    #[test]
    fn test_requirement_by_level() {
        let catalog = Catalog::builtin().unwrap();
        let m = catalog.measure("op.acc.2").unwrap();
        assert_eq!(m.requirement(SecurityLevel::Basic), "Existirán mecanismos de autenticación.");
        assert!(m.requirement(SecurityLevel::High).contains("multifactor"));
    }
}
