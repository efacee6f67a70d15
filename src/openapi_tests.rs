#[cfg(test)]
mod tests {
    use crate::schemas::ApiDoc;
    use utoipa::OpenApi;
    use utoipa::openapi::{PathItemType, RefOr, schema::Schema};

    fn object_properties(name: &str) -> Vec<String> {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.as_ref().unwrap();
        match components.schemas.get(name) {
            Some(RefOr::T(Schema::Object(obj))) => obj.properties.keys().cloned().collect(),
            _ => panic!("{} should be an object schema", name),
        }
    }

    #[test]
    fn test_openapi_schema_generation() {
        let openapi = ApiDoc::openapi();

        assert!(openapi.components.is_some());
        let components = openapi.components.as_ref().unwrap();
        for name in ["ErrorResponse", "HealthResponse", "RecipeResponse", "UserResponse"] {
            assert!(components.schemas.contains_key(name), "missing schema {}", name);
        }

        assert!(serde_json::to_string(&openapi).is_ok());
    }

    #[test]
    fn test_error_response_schema_structure() {
        let properties = object_properties("ErrorResponse");
        for key in ["error", "code", "success", "field"] {
            assert!(properties.iter().any(|p| p == key), "missing property {}", key);
        }
    }

    #[test]
    fn test_recipe_response_schema_structure() {
        let properties = object_properties("RecipeResponse");
        for key in [
            "id",
            "tags",
            "author",
            "ingredients",
            "is_favorited",
            "is_in_shopping_cart",
            "name",
            "image",
            "text",
            "cooking_time",
        ] {
            assert!(properties.iter().any(|p| p == key), "missing property {}", key);
        }
    }

    #[test]
    fn test_openapi_paths_contain_health_endpoint() {
        let openapi = ApiDoc::openapi();

        let health_path = openapi.paths.paths.get("/health").unwrap();
        let health_get = health_path.operations.get(&PathItemType::Get).unwrap();

        assert!(health_get.responses.responses.contains_key("200"));
        assert!(health_get.responses.responses.contains_key("500"));
    }

    #[test]
    fn test_openapi_paths_cover_recipe_routes() {
        let openapi = ApiDoc::openapi();
        let paths = &openapi.paths.paths;

        let detail = paths.get("/api/v1/recipes/{recipe_id}").unwrap();
        for method in [PathItemType::Get, PathItemType::Patch, PathItemType::Delete] {
            assert!(detail.operations.contains_key(&method));
        }

        let favorite = paths.get("/api/v1/recipes/{recipe_id}/favorite").unwrap();
        assert!(favorite.operations.contains_key(&PathItemType::Post));
        assert!(favorite.operations.contains_key(&PathItemType::Delete));

        assert!(paths.contains_key("/api/v1/recipes/download_shopping_cart"));
        assert!(paths.contains_key("/api/v1/users/{user_id}/subscribe"));
        assert!(paths.contains_key("/api/v1/auth/token/login"));
    }

    #[test]
    fn test_all_error_responses_reference_correct_schema() {
        let openapi = ApiDoc::openapi();
        let openapi_json = serde_json::to_string(&openapi).unwrap();

        assert!(!openapi_json.contains("crate.schemas.ErrorResponse"));
        assert!(!openapi_json.contains("crate::schemas::ErrorResponse"));
        assert!(openapi_json.contains("#/components/schemas/ErrorResponse"));
    }
}
