//! Shared helpers for flow implementations (per-user guards, facade and assertion setup).

// self
use crate::{
	_prelude::*,
	auth::UserId,
	flows::Broker,
	http::TokenHttpClient,
	oauth::{TokenFacade, TransportErrorMapper},
};

/// Returns (and creates on demand) the per-user guard serializing token mutations.
pub(crate) fn flow_guard<C, M>(broker: &Broker<C, M>, user: &UserId) -> Arc<AsyncMutex<()>>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let mut guards = broker.flow_guards.lock();

	guards.entry(user.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
}

/// Drops guards no caller currently holds or waits on; returns how many were removed.
pub(crate) fn prune_flow_guards<C, M>(broker: &Broker<C, M>) -> usize
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	prune_idle(&mut broker.flow_guards.lock())
}

fn prune_idle(guards: &mut HashMap<UserId, Arc<AsyncMutex<()>>>) -> usize {
	let before = guards.len();

	// The map owns one reference; anything above that is an in-flight caller.
	guards.retain(|_, guard| Arc::strong_count(guard) > 1);

	before - guards.len()
}

/// Builds the token endpoint facade for this broker's client configuration.
pub(crate) fn token_facade<C, M>(broker: &Broker<C, M>) -> Result<TokenFacade<C, M>>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	TokenFacade::from_descriptor(
		&broker.descriptor,
		&broker.client_id,
		&broker.redirect_uri,
		broker.http_client.clone(),
		broker.transport_mapper.clone(),
	)
	.map_err(Error::from)
}

/// Signs a fresh client assertion addressed to the token endpoint.
pub(crate) fn client_assertion<C, M>(broker: &Broker<C, M>) -> Result<String>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	broker
		.signer
		.build_assertion(&broker.client_id, &broker.descriptor.endpoints.token)
		.map_err(Error::from)
}
