use crate::entity::Entity;

/// Four people, one per department A-D; only "John Doe" matches "john".
pub(crate) fn sample_entities() -> Vec<Entity> {
    vec![
        Entity::new("John Doe")
            .with_category("Engineering")
            .with_departments(["Department A"])
            .at(37.7749, -122.4194),
        Entity::new("Emily Carter")
            .with_category("Finance")
            .with_departments(["Department B"])
            .at(25.7617, -80.1918),
        Entity::new("Michael Rodriguez")
            .with_category(" Operations ")
            .with_departments(["Department C"])
            .at(39.7392, -104.9903),
        Entity::new("Sarah Williams")
            .with_departments(["Department D", "Department C"])
            .at(30.2672, -97.7431),
    ]
}
