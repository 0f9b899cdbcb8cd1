//! Yew hooks over stored blobs and contract calls.
use std::ops::Deref;
use std::rc::Rc;

use etherealm_game::{
    Address, ChainClient, ChainError, KeyValueStore, Namespace, ReadCall, ReadResult, StoredBlob,
    TxHash, WriteCall,
};
use yew::platform::spawn_local;
use yew::prelude::*;

/// Current value of a stored blob plus a write-through setter.
pub struct StoredHandle<T> {
    value: UseStateHandle<T>,
    setter: Callback<T>,
}

impl<T> Clone for StoredHandle<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            setter: self.setter.clone(),
        }
    }
}

impl<T> Deref for StoredHandle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Clone> StoredHandle<T> {
    /// Replace the blob, persisting it before the re-render.
    pub fn set(&self, next: T) {
        self.setter.emit(next);
    }

    /// Edit a copy of the current blob and store it.
    pub fn update(&self, edit: impl FnOnce(&mut T)) {
        let mut next = (*self.value).clone();
        edit(&mut next);
        self.set(next);
    }

    #[must_use]
    pub fn setter(&self) -> Callback<T> {
        self.setter.clone()
    }
}

/// Component state backed by the `T` blob in `ns`. Reloads when the
/// namespace changes (wallet connect or switch). A failed write is logged and
/// the in-memory value still updates, so the next successful write persists it.
#[hook]
pub fn use_stored<S, T>(store: &S, ns: &Namespace) -> StoredHandle<T>
where
    S: KeyValueStore + Clone + 'static,
    T: StoredBlob + Clone + PartialEq + 'static,
{
    let value = {
        let store = store.clone();
        let ns = ns.clone();
        use_state_eq(move || T::load(&store, &ns))
    };
    {
        let value = value.clone();
        let store = store.clone();
        use_effect_with(ns.clone(), move |ns| {
            value.set(T::load(&store, ns));
            || {}
        });
    }
    let setter = {
        let value = value.clone();
        let store = store.clone();
        let ns = ns.clone();
        Callback::from(move |next: T| {
            if let Err(err) = next.save(&store, &ns) {
                log::warn!("could not persist {}: {err}", ns.key(T::KEY));
            }
            value.set(next);
        })
    };
    StoredHandle { value, setter }
}

/// Progress of a contract read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadState {
    pub loading: bool,
    pub data: Option<ReadResult>,
    pub error: Option<String>,
}

impl Default for ReadState {
    fn default() -> Self {
        Self {
            loading: true,
            data: None,
            error: None,
        }
    }
}

impl ReadState {
    /// A refresh keeps showing the previous data until the new answer lands.
    #[must_use]
    pub fn started(&self) -> Self {
        Self {
            loading: true,
            data: self.data.clone(),
            error: None,
        }
    }

    #[must_use]
    pub fn finished(result: Result<ReadResult, ChainError>) -> Self {
        match result {
            Ok(data) => Self {
                loading: false,
                data: Some(data),
                error: None,
            },
            Err(err) => Self {
                loading: false,
                data: None,
                error: Some(err.to_string()),
            },
        }
    }
}

pub struct ChainReadHandle {
    pub state: ReadState,
    pub refresh: Callback<()>,
}

/// Run `call` on mount and whenever it changes. Answers to superseded
/// requests are dropped.
#[hook]
pub fn use_chain_read<C>(client: &Rc<C>, call: &ReadCall) -> ChainReadHandle
where
    C: ChainClient + 'static,
{
    let state = use_state(ReadState::default);
    let generation = use_mut_ref(|| 0_u64);
    let refresh = {
        let state = state.clone();
        let client = Rc::clone(client);
        let call = call.clone();
        Callback::from(move |()| {
            let ticket = {
                let mut current = generation.borrow_mut();
                *current += 1;
                *current
            };
            state.set(state.started());
            let state = state.clone();
            let client = Rc::clone(&client);
            let call = call.clone();
            let generation = Rc::clone(&generation);
            spawn_local(async move {
                let result = client.read(&call).await;
                if *generation.borrow() == ticket {
                    state.set(ReadState::finished(result));
                } else {
                    log::debug!("dropping stale {call:?} answer");
                }
            });
        })
    };
    {
        let refresh = refresh.clone();
        use_effect_with(call.clone(), move |_| {
            refresh.emit(());
            || {}
        });
    }
    ChainReadHandle {
        state: (*state).clone(),
        refresh,
    }
}

/// Progress of the latest contract write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteState {
    pub pending: bool,
    pub tx_hash: Option<TxHash>,
    pub error: Option<String>,
}

impl WriteState {
    #[must_use]
    pub const fn sending() -> Self {
        Self {
            pending: true,
            tx_hash: None,
            error: None,
        }
    }

    #[must_use]
    pub fn finished(result: Result<TxHash, ChainError>) -> Self {
        match result {
            Ok(hash) => Self {
                pending: false,
                tx_hash: Some(hash),
                error: None,
            },
            Err(err) => Self {
                pending: false,
                tx_hash: None,
                error: Some(err.to_string()),
            },
        }
    }
}

pub struct ChainWriteHandle {
    pub state: WriteState,
    pub send: Callback<(Address, WriteCall)>,
}

/// Send contract writes one at a time. A send while another is pending is
/// ignored.
#[hook]
pub fn use_chain_write<C>(client: &Rc<C>) -> ChainWriteHandle
where
    C: ChainClient + 'static,
{
    let state = use_state(WriteState::default);
    let in_flight = use_mut_ref(|| false);
    let send = {
        let state = state.clone();
        let client = Rc::clone(client);
        Callback::from(move |(from, call): (Address, WriteCall)| {
            if std::mem::replace(&mut *in_flight.borrow_mut(), true) {
                log::debug!("write ignored, another is pending");
                return;
            }
            state.set(WriteState::sending());
            let state = state.clone();
            let client = Rc::clone(&client);
            let in_flight = Rc::clone(&in_flight);
            spawn_local(async move {
                let result = client.write(from, &call).await;
                if let Err(err) = &result {
                    log::warn!("write failed: {err}");
                }
                *in_flight.borrow_mut() = false;
                state.set(WriteState::finished(result));
            });
        })
    };
    ChainWriteHandle {
        state: (*state).clone(),
        send,
    }
}
