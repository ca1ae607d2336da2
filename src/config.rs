use std::env;

pub struct Config {
    pub database_url: String,
    pub frontend_origin: String,
    pub jwt_secret: String,
    pub auth_cookie_secure: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok(); // Load .env file

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let frontend_origin = env::var("FRONTEND_ORIGIN").expect("FRONTEND_ORIGIN must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let auth_cookie_secure = env::var("AUTH_COOKIE_SECURE")
            .map(|value| value != "false")
            .unwrap_or(true);

        Config {
            database_url,
            frontend_origin,
            jwt_secret,
            auth_cookie_secure,
        }
    }
}
