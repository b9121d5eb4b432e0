//! TokenManager: the typed façade over the `tokens` slice.

use crate::model::{Token, TokenStatus};
use crate::state::StateStore;

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum TokenError {
    #[error("token id `{id}` already exists")]
    #[diagnostic(code(infra_sim_core::token_manager::duplicate_id))]
    DuplicateId { id: String },
}

/// Thin façade over the `tokens` slice. Holds no state of its own.
pub struct TokenManager;

impl TokenManager {
    pub fn add(store: &mut StateStore, token: Token) -> Result<(), TokenError> {
        if store.get_state().tokens.get().contains_key(&token.id) {
            return Err(TokenError::DuplicateId { id: token.id });
        }
        store.update_tokens(|tokens| {
            let mut next = tokens.clone();
            next.insert(token.id.clone(), token.clone());
            next
        });
        Ok(())
    }

    pub fn get<'a>(store: &'a StateStore, id: &str) -> Option<&'a Token> {
        store.get_state().tokens.get().get(id)
    }

    pub fn has(store: &StateStore, id: &str) -> bool {
        store.get_state().tokens.get().contains_key(id)
    }

    pub fn count(store: &StateStore) -> usize {
        store.get_state().tokens.get().len()
    }

    pub fn get_all(store: &StateStore) -> Vec<Token> {
        store.get_state().tokens.get().values().cloned().collect()
    }

    pub fn get_ids(store: &StateStore) -> Vec<String> {
        store.get_state().tokens.get().keys().cloned().collect()
    }

    /// No-op if `id` is absent; otherwise applies `changes` to a clone of
    /// the token and writes it back.
    pub fn update(store: &mut StateStore, id: &str, changes: impl FnOnce(&mut Token)) {
        store.update_tokens(|tokens| {
            if !tokens.contains_key(id) {
                return tokens.clone();
            }
            let mut next = tokens.clone();
            if let Some(t) = next.get_mut(id) {
                changes(t);
            }
            next
        });
    }

    pub fn remove(store: &mut StateStore, id: &str) {
        store.update_tokens(|tokens| {
            if !tokens.contains_key(id) {
                return tokens.clone();
            }
            let mut next = tokens.clone();
            next.remove(id);
            next
        });
    }

    /// Replace many tokens in a single slice swap, used by the fixed-point
    /// loop to commit a whole iteration's worth of token advances at once.
    pub fn bulk_update(store: &mut StateStore, list: Vec<Token>) {
        store.update_tokens(|tokens| {
            let mut next = tokens.clone();
            for t in list {
                next.insert(t.id.clone(), t);
            }
            next
        });
    }

    pub fn by_status(store: &StateStore, status: TokenStatus) -> Vec<Token> {
        store
            .get_state()
            .tokens
            .get()
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect()
    }

    /// Traveling ∪ waiting tokens.
    pub fn active(store: &StateStore) -> Vec<Token> {
        store
            .get_state()
            .tokens
            .get()
            .values()
            .filter(|t| t.is_active())
            .cloned()
            .collect()
    }

    pub fn on_edge(store: &StateStore, src: &str, tgt: &str) -> Vec<Token> {
        store
            .get_state()
            .tokens
            .get()
            .values()
            .filter(|t| {
                t.status == TokenStatus::Traveling
                    && t.current_node() == src
                    && t.next_node() == Some(tgt)
            })
            .cloned()
            .collect()
    }

    /// Tokens waiting at `node`, sorted by `wait_position`.
    pub fn waiting_at(store: &StateStore, node: &str) -> Vec<Token> {
        let mut v: Vec<Token> = store
            .get_state()
            .tokens
            .get()
            .values()
            .filter(|t| t.status == TokenStatus::Waiting && t.waiting_at_node.as_deref() == Some(node))
            .cloned()
            .collect();
        v.sort_by_key(|t| t.wait_position.unwrap_or(usize::MAX));
        v
    }

    /// Fail tokens waiting at `n` and tokens currently traveling toward `n`,
    /// used when `n` transitions to unavailable while tokens are already en
    /// route or queued there.
    pub fn fail_tokens_at_node(store: &mut StateStore, n: &str, now_ms: u64) {
        store.update_tokens(|tokens| {
            let mut next = tokens.clone();
            for t in next.values_mut() {
                let waiting_here = t.status == TokenStatus::Waiting
                    && t.waiting_at_node.as_deref() == Some(n);
                let traveling_here =
                    t.status == TokenStatus::Traveling && t.next_node() == Some(n);
                if waiting_here || traveling_here {
                    t.status = TokenStatus::Failed;
                    t.progress = 1.0;
                    t.waiting_at_node = None;
                    t.wait_position = None;
                    t.terminal_at_ms = Some(now_ms);
                }
            }
            next
        });
    }
}
