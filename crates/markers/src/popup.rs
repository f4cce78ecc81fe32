use directory::Entity;
use serde::Serialize;

/// Shown for any optional field an entity does not carry.
pub const PLACEHOLDER: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "url", rename_all = "snake_case")]
pub enum PopupImage {
    Url(String),
    Placeholder,
}

/// Popup payload for one marker.
///
/// Built infallibly: every absent or blank field degrades to a placeholder
/// (or is omitted, for role and profile link).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopupContent {
    pub name: String,
    pub category: String,
    pub role: Option<String>,
    pub departments: String,
    pub company: String,
    pub location: String,
    pub profile_url: Option<String>,
    pub image: PopupImage,
}

impl PopupContent {
    pub fn from_entity(entity: &Entity) -> Self {
        let image = match non_blank(entity.image.as_deref()) {
            Some(url) => PopupImage::Url(url.to_string()),
            None => PopupImage::Placeholder,
        };
        let departments = if entity.departments.is_empty() {
            PLACEHOLDER.to_string()
        } else {
            entity.departments.join(", ")
        };

        Self {
            name: or_placeholder(Some(entity.name.as_str())),
            category: or_placeholder(entity.category.as_deref()),
            role: non_blank(entity.role.as_deref()).map(str::to_string),
            departments,
            company: or_placeholder(entity.company.as_deref()),
            location: or_placeholder(entity.location.as_deref()),
            profile_url: non_blank(entity.profile_url.as_deref()).map(str::to_string),
            image,
        }
    }

    /// Labeled detail rows in display order.
    pub fn rows(&self) -> Vec<(&'static str, &str)> {
        let mut rows = vec![("Category", self.category.as_str())];
        if let Some(role) = &self.role {
            rows.push(("Role", role.as_str()));
        }
        rows.push(("Department", self.departments.as_str()));
        rows.push(("Company", self.company.as_str()));
        rows.push(("Location", self.location.as_str()));
        if let Some(url) = &self.profile_url {
            rows.push(("Profile", url.as_str()));
        }
        rows
    }
}

fn non_blank(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

fn or_placeholder(v: Option<&str>) -> String {
    non_blank(v).unwrap_or(PLACEHOLDER).to_string()
}

#[cfg(test)]
mod tests {
    use super::{PLACEHOLDER, PopupContent, PopupImage};
    use directory::Entity;
    use pretty_assertions::assert_eq;

    #[test]
    fn bare_entity_renders_placeholders() {
        let p = PopupContent::from_entity(&Entity::default());
        assert_eq!(p.name, PLACEHOLDER);
        assert_eq!(p.category, PLACEHOLDER);
        assert_eq!(p.departments, PLACEHOLDER);
        assert_eq!(p.image, PopupImage::Placeholder);
        assert_eq!(
            p.rows(),
            vec![
                ("Category", PLACEHOLDER),
                ("Department", PLACEHOLDER),
                ("Company", PLACEHOLDER),
                ("Location", PLACEHOLDER),
            ]
        );
    }

    #[test]
    fn full_entity_renders_every_row() {
        let mut e = Entity::new("John Doe")
            .with_category("Engineering")
            .with_departments(["Department A", "Department C"]);
        e.role = Some("Software Developer".into());
        e.company = Some("ACME Corp".into());
        e.location = Some("San Francisco, CA".into());
        e.profile_url = Some("https://example.com/johndoe".into());
        e.image = Some("/placeholder-image.jpg".into());

        let p = PopupContent::from_entity(&e);
        assert_eq!(p.departments, "Department A, Department C");
        assert_eq!(p.image, PopupImage::Url("/placeholder-image.jpg".into()));
        let labels: Vec<&str> = p.rows().iter().map(|(k, _)| *k).collect();
        assert_eq!(
            labels,
            vec!["Category", "Role", "Department", "Company", "Location", "Profile"]
        );
    }

    #[test]
    fn blank_optional_fields_are_omitted() {
        let mut e = Entity::new("x");
        e.role = Some("   ".into());
        e.image = Some(String::new());
        let p = PopupContent::from_entity(&e);
        assert_eq!(p.role, None);
        assert_eq!(p.image, PopupImage::Placeholder);
    }
}
