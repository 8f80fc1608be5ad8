//! Route grouping for code generation.

// Internal imports (std, crate)
use crate::openapi::Method;

// External imports (alphabetized)
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// A path together with its full path item object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteItem {
    pub path: String,
    pub item: Value,
}

/// Routes grouped by tag, in first-encounter order.
pub type GroupedRoutes = IndexMap<String, Vec<RouteItem>>;

/// Group the paths of a document by the first tag of their representative
/// operation.
///
/// The representative operation is picked by fixed method priority
/// ([`Method::GROUPING_PRIORITY`]); only its tags are consulted, even when a
/// lower-priority operation of the same path is tagged. Paths without a tag
/// are left out of the result.
pub fn group_by_first_tag(paths: &Value) -> GroupedRoutes {
    let mut grouped = GroupedRoutes::new();
    let Some(paths) = paths.as_object() else {
        return grouped;
    };

    for (route_pattern, path_item) in paths {
        let representative = Method::GROUPING_PRIORITY
            .iter()
            .find_map(|method| path_item.get(method.as_str()));
        let tag = representative
            .and_then(|operation| operation.get("tags"))
            .and_then(Value::as_array)
            .and_then(|tags| tags.first())
            .and_then(Value::as_str)
            .filter(|tag| !tag.is_empty());

        match tag {
            Some(tag) => grouped
                .entry(tag.to_string())
                .or_default()
                .push(RouteItem {
                    path: route_pattern.clone(),
                    item: path_item.clone(),
                }),
            None => {
                log::debug!("Route {route_pattern} has no tag on its first operation, skipping.");
            }
        }
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn groups_routes_by_the_first_tag() {
        let paths = json!({
            "/pets": {
                "get": {"operationId": "listPets", "tags": ["pets", "store"]},
                "post": {"operationId": "createPet", "tags": ["admin"]}
            },
            "/pets/{petId}": {
                "delete": {"operationId": "deletePet", "tags": ["pets"]}
            },
            "/orders": {
                "post": {"operationId": "placeOrder", "tags": ["store"]}
            }
        });

        let grouped = group_by_first_tag(&paths);
        let tags: Vec<&str> = grouped.keys().map(String::as_str).collect();
        assert_eq!(tags, ["pets", "store"]);

        let pets: Vec<&str> = grouped["pets"].iter().map(|r| r.path.as_str()).collect();
        assert_eq!(pets, ["/pets", "/pets/{petId}"]);
        assert_eq!(grouped["store"][0].path, "/orders");
        assert_eq!(grouped["pets"][0].item["get"]["operationId"], "listPets");
    }

    #[test]
    fn the_representative_operation_follows_method_priority() {
        let paths = json!({
            "/orders": {
                "put": {"operationId": "replaceOrder", "tags": ["replace"]},
                "post": {"operationId": "placeOrder", "tags": ["place"]}
            }
        });

        let grouped = group_by_first_tag(&paths);
        assert!(grouped.contains_key("place"));
        assert!(!grouped.contains_key("replace"));
    }

    #[test]
    fn only_the_representative_tags_are_consulted() {
        // `get` wins the priority but has no tags, so the path is dropped
        // even though `post` is tagged.
        let paths = json!({
            "/orders": {
                "get": {"operationId": "listOrders"},
                "post": {"operationId": "placeOrder", "tags": ["store"]}
            }
        });

        assert!(group_by_first_tag(&paths).is_empty());
    }

    #[test]
    fn untagged_routes_are_dropped() {
        let paths = json!({
            "/health": {"get": {"operationId": "health"}},
            "/empty": {"get": {"operationId": "empty", "tags": []}},
            "/blank": {"get": {"operationId": "blank", "tags": [""]}}
        });

        assert!(group_by_first_tag(&paths).is_empty());
    }
}
