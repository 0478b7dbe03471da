use serde::Serialize;

/// Login request payload, built fresh for every attempt and dropped after
/// the call. The wire field is `email` regardless of what the login form
/// labels it; the auth endpoint accepts no other shape.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    pub fn new(identifier: &str, secret: &str) -> Self {
        Self {
            email: identifier.to_string(),
            password: secret.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_email_field_name() {
        let creds = Credentials::new("viewer@example.org", "hunter2");
        let value = serde_json::to_value(&creds).unwrap();
        assert_eq!(value["email"], "viewer@example.org");
        assert_eq!(value["password"], "hunter2");
        assert_eq!(value.as_object().unwrap().len(), 2);
    }
}
