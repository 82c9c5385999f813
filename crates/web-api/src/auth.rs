//! JWT 认证模块
//!
//! 账号体系在外部系统，这里只负责验签和归一化请求身份。

use application::Identity;
use axum::http::HeaderMap;
use config::JwtConfig;
use domain::UserId;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// JWT Claims 结构
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub exp: i64, // 过期时间 (Unix timestamp)
}

/// JWT Token 服务
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_ref());
        let decoding_key = DecodingKey::from_secret(config.secret.as_ref());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 生成 JWT token
    pub fn generate_token(&self, user_id: Uuid) -> Result<String, ApiError> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::hours(self.config.expiration_hours);

        let claims = Claims {
            user_id,
            exp: exp.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| ApiError::internal(format!("token generation failed: {}", err)))
    }

    /// 验证并解析 JWT token
    pub fn verify_token(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|token_data| token_data.claims)
            .ok()
    }

    /// 归一化请求身份：头缺失、格式不对、验签失败一律视为未认证。
    pub fn resolve_identity(&self, headers: &HeaderMap) -> Identity {
        let Some(token) = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
        else {
            return Identity::Unauthenticated;
        };

        match self.verify_token(token) {
            Some(claims) => Identity::Authenticated(UserId::from(claims.user_id)),
            None => Identity::Unauthenticated,
        }
    }

    /// 需要登录的路由用这个：未认证返回 401。
    pub fn require_user(&self, headers: &HeaderMap) -> Result<UserId, ApiError> {
        self.resolve_identity(headers)
            .user_id()
            .ok_or_else(ApiError::unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::AUTHORIZATION;

    fn service() -> JwtService {
        JwtService::new(JwtConfig {
            secret: "test-secret-key-with-at-least-32-characters".to_string(),
            expiration_hours: 1,
        })
    }

    #[test]
    fn token_round_trip_resolves_authenticated_identity() {
        let service = service();
        let user_id = Uuid::new_v4();
        let token = service.generate_token(user_id).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {}", token).parse().unwrap());

        assert_eq!(
            service.resolve_identity(&headers),
            Identity::Authenticated(UserId::from(user_id))
        );
    }

    #[test]
    fn missing_or_garbage_header_is_unauthenticated() {
        let service = service();

        assert_eq!(
            service.resolve_identity(&HeaderMap::new()),
            Identity::Unauthenticated
        );

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer not-a-token".parse().unwrap());
        assert_eq!(service.resolve_identity(&headers), Identity::Unauthenticated);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(service.resolve_identity(&headers), Identity::Unauthenticated);
    }
}
