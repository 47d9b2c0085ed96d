//! Service entry point.

use crate::auth::{AuthProvider, User, parse_login_redirect};
use crate::config::ServiceConfig;
use crate::decorator::RequestDecorator;
use crate::dispatch::WorkerPool;
use crate::error::{ClientError, ClientResult, Operation, OperationError};
use crate::table::Table;
use crate::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
use mobilestack_model::TableEntity;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

pub(crate) struct ServiceInner {
    pub(crate) config: ServiceConfig,
    transport: Arc<dyn Transport>,
    decorator: RequestDecorator,
    pub(crate) pool: WorkerPool,
    user: RwLock<Option<User>>,
}

impl ServiceInner {
    /// Decorates and sends one request, accepting only the operation's
    /// success status.
    pub(crate) fn send(
        &self,
        operation: Operation,
        request: HttpRequest,
    ) -> Result<HttpResponse, OperationError> {
        let request = self.decorator.decorate(request);
        debug!(%operation, method = %request.method, url = %request.url, "sending request");

        let response = self
            .transport
            .execute(request)
            .map_err(|source| OperationError::Transport { operation, source })?;

        let expected = operation.expected_status();
        if response.status != expected {
            warn!(%operation, status = response.status, expected, "unexpected response status");
            return Err(OperationError::UnexpectedStatus {
                operation,
                status: response.status,
                body: response.body,
            });
        }
        Ok(response)
    }
}

/// Handle to one hosted mobile service. Cheap to clone; clones share the
/// transport, the signed-in user and the worker pool.
#[derive(Clone)]
pub struct MobileService {
    inner: Arc<ServiceInner>,
}

impl MobileService {
    /// Connects over HTTPS with a reqwest transport.
    pub fn new(config: ServiceConfig) -> ClientResult<Self> {
        let config = config.validate()?;
        let transport = ReqwestTransport::new(Duration::from_secs(config.request_timeout_secs))
            .map_err(|e| ClientError::Config(format!("cannot build HTTP client: {e}")))?;
        Self::build(config, Arc::new(transport))
    }

    /// Uses a caller-supplied transport.
    pub fn with_transport(config: ServiceConfig, transport: Arc<dyn Transport>) -> ClientResult<Self> {
        Self::build(config.validate()?, transport)
    }

    fn build(config: ServiceConfig, transport: Arc<dyn Transport>) -> ClientResult<Self> {
        let pool = WorkerPool::new(config.worker_threads, config.max_blocking_threads)
            .map_err(ClientError::WorkerPool)?;
        let decorator = RequestDecorator::new(config.application_key.clone());
        info!(url = %config.service_url, "mobile service client ready");

        Ok(Self {
            inner: Arc::new(ServiceInner {
                config,
                transport,
                decorator,
                pool,
                user: RwLock::new(None),
            }),
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    /// Returns the client for `E`'s table. Fails if `E`'s declaration is
    /// invalid.
    pub fn table<E: TableEntity>(&self) -> ClientResult<Table<E>> {
        let schema = E::schema()?;
        Ok(Table::new(self.inner.clone(), schema))
    }

    /// Handle of the worker pool's runtime, for posting callbacks onto it.
    pub fn worker_handle(&self) -> Option<tokio::runtime::Handle> {
        self.inner.pool.handle()
    }

    // ── Authentication ──

    /// Page the host should open to start a login with `provider`.
    pub fn login_url(&self, provider: AuthProvider) -> String {
        format!("{}/login/{}", self.inner.config.service_url, provider)
    }

    /// URL prefix the login flow redirects to once finished.
    pub fn login_done_url(&self) -> String {
        format!("{}/login/done", self.inner.config.service_url)
    }

    /// Signs in from the final login redirect.
    pub fn complete_login(&self, redirect_url: &str) -> ClientResult<User> {
        let user = parse_login_redirect(redirect_url)?;
        self.set_user(user.clone());
        Ok(user)
    }

    pub fn set_user(&self, user: User) {
        info!(user_id = %user.user_id, "user signed in");
        self.inner
            .decorator
            .set_auth_token(user.authentication_token.clone());
        *self.inner.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user);
    }

    pub fn current_user(&self) -> Option<User> {
        self.inner
            .user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn logout(&self) {
        let previous = self
            .inner
            .user
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.inner.decorator.clear_auth_token();
        if let Some(user) = previous {
            info!(user_id = %user.user_id, "user signed out");
        }
    }
}
