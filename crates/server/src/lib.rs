use db::DBService;
use utils_jwt::TokenService;

pub mod error;
pub mod http;
pub mod middleware;
pub mod routes;

#[cfg(test)]
pub(crate) mod test_support;

/// Everything a request handler needs, built once in `main` and cloned into
/// the router. There is deliberately no global handle; tests construct
/// their own state against throwaway databases.
#[derive(Clone)]
pub struct AppState {
    db: DBService,
    tokens: TokenService,
}

impl AppState {
    pub fn new(db: DBService, tokens: TokenService) -> Self {
        Self { db, tokens }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }
}
