//! Request and response bodies of the reqres.in API.

use crate::model;

model! {
    pub struct RegistrationRequest {
        pub email: String,
        pub password: String,
    }
}

model! {
    /// `POST /register` for a known account.
    pub struct RegistrationResponse {
        pub id: Option<i64>,
        pub token: String,
    }
}

model! {
    /// `POST /register` for an unknown account.
    pub struct RegistrationFailedResponse {
        pub error: String,
    }
}

model! {
    pub struct UserData {
        pub id: i64,
        pub email: String,
        pub first_name: String,
        pub last_name: String,
        pub avatar: String,
    }
}

model! {
    pub struct Support {
        pub url: String,
        pub text: String,
    }
}

model! {
    pub struct UserResponse {
        pub data: UserData,
        pub support: Support,
    }
}

model! {
    pub struct ResourceData {
        pub id: i64,
        pub name: String,
        pub year: i64,
        pub color: String,
        pub pantone_value: String,
    }
}

model! {
    /// `GET /unknown/{id}`.
    pub struct ResourceResponse {
        pub data: ResourceData,
        pub support: Support,
    }
}

model! {
    pub struct CreateUserRequest {
        pub name: String,
        pub job: String,
    }
}

model! {
    pub struct CreateUserResponse {
        pub name: String,
        pub job: String,
        pub id: String,
        pub created_at as "createdAt": String,
    }
}

model! {
    /// `GET /users?page=N` and `GET /users?delay=N`.
    pub struct UsersListResponse {
        pub page: i64,
        pub per_page: i64,
        pub total: i64,
        pub total_pages: i64,
        pub data: Vec<UserData>,
        pub support: Support,
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::model::bind;
    use crate::model::to_wire;
    use crate::models::CreateUserRequest;
    use crate::models::CreateUserResponse;
    use crate::models::UserResponse;
    use crate::models::UsersListResponse;

    #[test]
    fn single_user_binds_nested_data() {
        let body = json!({
            "data": {
                "id": 2,
                "email": "janet.weaver@reqres.in",
                "first_name": "Janet",
                "last_name": "Weaver",
                "avatar": "https://reqres.in/img/faces/2-image.jpg"
            },
            "support": {
                "url": "https://contentcaddy.io?utm_source=reqres",
                "text": "Tired of writing endless social media content?"
            },
            "_meta": {"powered_by": "reqres"}
        });

        let user: UserResponse = bind(&body).unwrap();
        assert_eq!(user.data.first_name, "Janet");
        assert_eq!(user.data.last_name, "Weaver");
        assert_eq!(user.support.url, "https://contentcaddy.io?utm_source=reqres");
    }

    #[test]
    fn users_page_keeps_element_order() {
        let body = json!({
            "page": 1, "per_page": 6, "total": 12, "total_pages": 2,
            "data": [
                {"id": 1, "email": "george.bluth@reqres.in"},
                {"id": 2, "email": "janet.weaver@reqres.in"},
            ]
        });

        let page: UsersListResponse = bind(&body).unwrap();
        assert_eq!(page.per_page, 6);
        assert_eq!(page.total_pages, 2);
        let ids: Vec<_> = page.data.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(page.support.text, "");
    }

    #[test]
    fn create_user_response_reads_camel_case() {
        let created: CreateUserResponse = bind(&json!({
            "name": "Adrian Doe Jr",
            "job": "Java developer",
            "id": "512",
            "createdAt": "2026-10-18T10:00:00.000Z"
        }))
        .unwrap();
        assert_eq!(created.created_at, "2026-10-18T10:00:00.000Z");
    }

    #[test]
    fn create_user_request_wire_form() {
        let request = CreateUserRequest {
            name: "Adrian Doe".into(),
            job: "C# developer".into(),
        };
        assert_eq!(
            to_wire(&request).unwrap(),
            json!({"name": "Adrian Doe", "job": "C# developer"})
        );
    }
}
