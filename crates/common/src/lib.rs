pub mod types;
pub mod utils;
pub mod env;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_type_ok() {
        let h = types::Health { status: "ok" };
        assert_eq!(h.status, "ok");
    }

    #[test]
    fn status_body_shapes() {
        let ok = serde_json::to_value(types::StatusBody::success()).unwrap();
        assert_eq!(ok, serde_json::json!({"status": "success"}));

        let err = serde_json::to_value(types::StatusBody::error("User already exists")).unwrap();
        assert_eq!(err, serde_json::json!({"status": "error", "message": "User already exists"}));
    }
}
