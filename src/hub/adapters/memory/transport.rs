//! In-memory transport adapter for hub tests and deterministic flows.

use crate::hub::{
    domain::{EndpointAddress, OperationDescriptor, TransportParams},
    ports::{ConnectionHandle, EndpointConnector, TransportError, TransportResult},
};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Invocation observed by the in-memory transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedInvocation {
    /// Address of the endpoint that received the call.
    pub address: EndpointAddress,
    /// Handle instance that carried the call.
    pub instance: u64,
    /// Operation name as forwarded.
    pub operation: String,
    /// Arguments as forwarded.
    pub arguments: Value,
}

/// In-memory connector.
///
/// Endpoints are simulated per address: each address can be given an
/// operation catalog, canned invocation results, and injected failures for
/// connect, listing, invocation and close. Every successful connect yields a
/// handle with a fresh instance number, which makes reconnects observable.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConnector {
    state: Arc<RwLock<InMemoryTransportState>>,
}

#[derive(Debug, Default)]
struct InMemoryTransportState {
    catalogs: HashMap<EndpointAddress, Vec<OperationDescriptor>>,
    results: HashMap<(EndpointAddress, String), Value>,
    connect_failures: HashSet<EndpointAddress>,
    list_failures: HashSet<EndpointAddress>,
    invoke_failures: HashSet<(EndpointAddress, String)>,
    close_failures: HashSet<EndpointAddress>,
    connect_delay: Option<Duration>,
    invoke_delays: HashMap<EndpointAddress, Duration>,
    next_instance: u64,
    connects: Vec<(EndpointAddress, u64)>,
    open: BTreeSet<(EndpointAddress, u64)>,
    closes: Vec<(EndpointAddress, u64)>,
    invocations: Vec<RecordedInvocation>,
}

fn lock_error(err: &impl ToString) -> TransportError {
    TransportError::protocol(io::Error::other(err.to_string()))
}

impl InMemoryConnector {
    /// Creates a connector with no simulated endpoints configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn write<T>(
        &self,
        change: impl FnOnce(&mut InMemoryTransportState) -> T,
    ) -> TransportResult<T> {
        let mut state = self.state.write().map_err(|err| lock_error(&err))?;
        Ok(change(&mut state))
    }

    fn read<T>(&self, query: impl FnOnce(&InMemoryTransportState) -> T) -> TransportResult<T> {
        let state = self.state.read().map_err(|err| lock_error(&err))?;
        Ok(query(&state))
    }

    /// Replaces the operation catalog advertised at `address`.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn set_operations(
        &self,
        address: &EndpointAddress,
        operations: Vec<OperationDescriptor>,
    ) -> TransportResult<()> {
        self.write(|state| {
            state.catalogs.insert(address.clone(), operations);
        })
    }

    /// Sets the result returned when `operation` is invoked at `address`.
    ///
    /// Without a canned result, invocations echo the operation and arguments.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn set_result(
        &self,
        address: &EndpointAddress,
        operation: impl Into<String>,
        result: Value,
    ) -> TransportResult<()> {
        self.write(|state| {
            state
                .results
                .insert((address.clone(), operation.into()), result);
        })
    }

    /// Makes connects to `address` fail or succeed again.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn fail_connect(&self, address: &EndpointAddress, failing: bool) -> TransportResult<()> {
        self.write(|state| toggle(&mut state.connect_failures, address.clone(), failing))
    }

    /// Makes operation listing at `address` fail or succeed again.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn fail_listing(&self, address: &EndpointAddress, failing: bool) -> TransportResult<()> {
        self.write(|state| toggle(&mut state.list_failures, address.clone(), failing))
    }

    /// Makes invocations of `operation` at `address` fail or succeed again.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn fail_invocation(
        &self,
        address: &EndpointAddress,
        operation: impl Into<String>,
        failing: bool,
    ) -> TransportResult<()> {
        self.write(|state| {
            toggle(
                &mut state.invoke_failures,
                (address.clone(), operation.into()),
                failing,
            );
        })
    }

    /// Makes the first close of handles for `address` report a failure. The
    /// handle is closed regardless.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn fail_close(&self, address: &EndpointAddress, failing: bool) -> TransportResult<()> {
        self.write(|state| toggle(&mut state.close_failures, address.clone(), failing))
    }

    /// Delays every connect by `delay`, simulating network latency.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn set_connect_delay(&self, delay: Duration) -> TransportResult<()> {
        self.write(|state| state.connect_delay = Some(delay))
    }

    /// Delays every invocation at `address` by `delay`. The invocation is
    /// recorded before the delay starts.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn set_invoke_delay(
        &self,
        address: &EndpointAddress,
        delay: Duration,
    ) -> TransportResult<()> {
        self.write(|state| {
            state.invoke_delays.insert(address.clone(), delay);
        })
    }

    /// Returns how many successful connects targeted `address`.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn connect_count(&self, address: &EndpointAddress) -> TransportResult<usize> {
        self.read(|state| {
            state
                .connects
                .iter()
                .filter(|(target, _)| target == address)
                .count()
        })
    }

    /// Returns how many handles for `address` have been closed.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn close_count(&self, address: &EndpointAddress) -> TransportResult<usize> {
        self.read(|state| {
            state
                .closes
                .iter()
                .filter(|(target, _)| target == address)
                .count()
        })
    }

    /// Returns the instance numbers of handles for `address` that are still
    /// open, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn open_instances(&self, address: &EndpointAddress) -> TransportResult<Vec<u64>> {
        self.read(|state| {
            state
                .open
                .iter()
                .filter(|(target, _)| target == address)
                .map(|(_, instance)| *instance)
                .collect()
        })
    }

    /// Returns the total number of open handles.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn open_count(&self) -> TransportResult<usize> {
        self.read(|state| state.open.len())
    }

    /// Returns every invocation received so far, in arrival order.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn invocations(&self) -> TransportResult<Vec<RecordedInvocation>> {
        self.read(|state| state.invocations.clone())
    }
}

fn toggle<T: Eq + std::hash::Hash>(set: &mut HashSet<T>, value: T, enabled: bool) {
    if enabled {
        set.insert(value);
    } else {
        set.remove(&value);
    }
}

#[async_trait]
impl EndpointConnector for InMemoryConnector {
    type Handle = InMemoryConnection;

    async fn connect(
        &self,
        address: &EndpointAddress,
        _params: &TransportParams,
    ) -> TransportResult<Self::Handle> {
        let delay = self.read(|state| state.connect_delay)?;
        if let Some(latency) = delay {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.write().map_err(|err| lock_error(&err))?;
        if state.connect_failures.contains(address) {
            return Err(TransportError::connect(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("{address} refused the connection"),
            )));
        }

        state.next_instance += 1;
        let instance = state.next_instance;
        state.connects.push((address.clone(), instance));
        state.open.insert((address.clone(), instance));

        Ok(InMemoryConnection {
            address: address.clone(),
            instance,
            closed: AtomicBool::new(false),
            state: Arc::clone(&self.state),
        })
    }
}

/// Handle produced by [`InMemoryConnector`].
#[derive(Debug)]
pub struct InMemoryConnection {
    address: EndpointAddress,
    instance: u64,
    closed: AtomicBool,
    state: Arc<RwLock<InMemoryTransportState>>,
}

impl InMemoryConnection {
    /// Returns the instance number assigned at connect time.
    #[must_use]
    pub const fn instance(&self) -> u64 {
        self.instance
    }

    fn ensure_open(&self) -> TransportResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl ConnectionHandle for InMemoryConnection {
    async fn list_operations(&self) -> TransportResult<Vec<OperationDescriptor>> {
        self.ensure_open()?;
        let state = self.state.read().map_err(|err| lock_error(&err))?;
        if state.list_failures.contains(&self.address) {
            return Err(TransportError::protocol(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} returned a malformed tool list", self.address),
            )));
        }
        Ok(state
            .catalogs
            .get(&self.address)
            .cloned()
            .unwrap_or_default())
    }

    async fn invoke(&self, operation: &str, arguments: Value) -> TransportResult<Value> {
        self.ensure_open()?;
        let delay = {
            let mut state = self.state.write().map_err(|err| lock_error(&err))?;
            state.invocations.push(RecordedInvocation {
                address: self.address.clone(),
                instance: self.instance,
                operation: operation.to_owned(),
                arguments: arguments.clone(),
            });
            state.invoke_delays.get(&self.address).copied()
        };
        if let Some(latency) = delay {
            tokio::time::sleep(latency).await;
            self.ensure_open()?;
        }

        let state = self.state.read().map_err(|err| lock_error(&err))?;
        let key = (self.address.clone(), operation.to_owned());
        if state.invoke_failures.contains(&key) {
            return Err(TransportError::invocation(io::Error::other(format!(
                "operation '{operation}' failed"
            ))));
        }

        Ok(state
            .results
            .get(&key)
            .cloned()
            .unwrap_or_else(|| json!({"operation": operation, "arguments": arguments})))
    }

    async fn close(&self) -> TransportResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut state = self.state.write().map_err(|err| lock_error(&err))?;
        state.open.remove(&(self.address.clone(), self.instance));
        state.closes.push((self.address.clone(), self.instance));
        if state.close_failures.contains(&self.address) {
            return Err(TransportError::protocol(io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("{} hung up during close", self.address),
            )));
        }
        Ok(())
    }
}
