use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::entity::Entity;
use crate::error::SourceError;

/// Pull-based supplier of the entity collection.
///
/// Each successful `load` is treated by the engine as a new collection
/// generation.
pub trait EntitySource {
    fn load(&self) -> Result<Vec<Entity>, SourceError>;
}

/// Entities held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entities: Vec<Entity>,
}

impl MemorySource {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self { entities }
    }
}

impl EntitySource for MemorySource {
    fn load(&self) -> Result<Vec<Entity>, SourceError> {
        Ok(self.entities.clone())
    }
}

/// Entities read from a JSON file on every `load`.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EntitySource for JsonFileSource {
    fn load(&self) -> Result<Vec<Entity>, SourceError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        parse_entities(&text)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Envelope { data: Vec<EnvelopeItem> },
    Flat(Vec<Entity>),
}

#[derive(Deserialize)]
struct EnvelopeItem {
    attributes: EnvelopeAttributes,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EnvelopeAttributes {
    #[serde(default)]
    name: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    departments: Vec<String>,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    profile_link: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    image: Option<MediaRef>,
}

// Media references are nested as `{ data: { attributes: { url } } }`; any
// level may be null.
#[derive(Deserialize)]
struct MediaRef {
    data: Option<MediaData>,
}

#[derive(Deserialize)]
struct MediaData {
    attributes: Option<MediaAttributes>,
}

#[derive(Deserialize)]
struct MediaAttributes {
    url: Option<String>,
}

impl From<EnvelopeAttributes> for Entity {
    fn from(a: EnvelopeAttributes) -> Self {
        let image = a
            .image
            .and_then(|m| m.data)
            .and_then(|d| d.attributes)
            .and_then(|a| a.url);
        Entity {
            name: a.name,
            category: a.category,
            role: a.role,
            departments: a.departments,
            company: a.company,
            location: a.location,
            profile_url: a.profile_link,
            image,
            lat: a.latitude,
            lng: a.longitude,
            attributes: Default::default(),
        }
    }
}

/// Parses either a flat JSON array of entities or the `{ "data": [...] }`
/// envelope with PascalCase attribute records.
pub fn parse_entities(text: &str) -> Result<Vec<Entity>, SourceError> {
    let payload: Payload = serde_json::from_str(text)?;
    Ok(match payload {
        Payload::Envelope { data } => data.into_iter().map(|i| i.attributes.into()).collect(),
        Payload::Flat(entities) => entities,
    })
}
