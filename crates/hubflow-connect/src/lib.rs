//! # hubflow-connect
//!
//! Links a signed-in seller to their Mercado Livre account.
//!
//! The flow has two halves:
//!
//! - **Initiation** (`GET /api/ml/connect`): a `302` to the provider's
//!   consent screen carrying `response_type`, `client_id` and `redirect_uri`.
//! - **Callback** (`GET /api/ml/callback`): validate the `code`, resolve the
//!   local user from the session cookie, trade the code for tokens and upsert
//!   them into the credential store with administrative privilege.
//!
//! Identity resolution, the token endpoint and the credential store are
//! injected as traits ([`IdentityResolver`], [`TokenExchangeClient`],
//! [`AdminCredentialStore`]) so the flow can be driven without a network.
//!
//! ## Example
//!
//! ```rust,ignore
//! use hubflow_connect::{ConnectSettings, ConnectState, create_router};
//!
//! let state = ConnectState::new(initiator, identity, tokens, store, ConnectSettings::default());
//! let app = create_router(state);
//! ```

pub mod account;
pub mod error;
pub mod exchanger;
pub mod handlers;
pub mod identity;
pub mod initiator;
pub mod provider;
pub mod response;
pub mod routes;
pub mod state;
pub mod store;

pub use account::{AccountError, AccountService, ConnectionStatus};
pub use error::{ExchangeError, IdentityError, StoreError, TokenExchangeError};
pub use exchanger::{CallbackExchanger, CallbackParams, ConnectedAccount, to_response};
pub use identity::{IdentityResolver, RequestContext, SupabaseIdentityResolver};
pub use initiator::AuthorizationInitiator;
pub use provider::{MercadoLivreClient, TokenExchangeClient, TokenGrant};
pub use routes::create_router;
pub use state::{ConnectSettings, ConnectState};
pub use store::{
    AdminCredentialStore, MemoryCredentialStore, SqliteCredentialStore, SupabaseProfileStore,
    create_store,
};
