//! Reductions built on Concentrate and Spread.

use bytes::Bytes;

use ddd_core::ExceptionCode;

use crate::error::{Result, TransportError};
use crate::transport::Transport;

fn decode_u64(payload: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = payload.try_into().map_err(|_| {
        TransportError::Malformed(format!("expected 8-byte counter, got {} bytes", payload.len()))
    })?;
    Ok(u64::from_le_bytes(bytes))
}

fn encode_u64(value: u64) -> Bytes {
    Bytes::copy_from_slice(&value.to_le_bytes())
}

/// Zero encodes "no exception".
fn decode_exception(payload: &[u8]) -> Result<Option<ExceptionCode>> {
    let bytes: [u8; 4] = payload.try_into().map_err(|_| {
        TransportError::Malformed(format!("expected 4-byte exception, got {} bytes", payload.len()))
    })?;
    match i32::from_le_bytes(bytes) {
        0 => Ok(None),
        code => ExceptionCode::new(code)
            .map(Some)
            .map_err(|e| TransportError::Malformed(e.to_string())),
    }
}

fn encode_exception(code: Option<ExceptionCode>) -> Bytes {
    let raw = code.map_or(0, ExceptionCode::code);
    Bytes::copy_from_slice(&raw.to_le_bytes())
}

/// Combine one value per rank up the tree and hand the result back down.
async fn all_reduce<T, V>(
    transport: &T,
    value: V,
    encode: fn(V) -> Bytes,
    decode: fn(&[u8]) -> Result<V>,
    combine: fn(V, V) -> V,
) -> Result<V>
where
    T: Transport,
    V: Copy,
{
    let tree = transport.tree();

    let mut acc = value;
    for &child in tree.children() {
        let payload = transport.concentrate_recv(child).await?;
        acc = combine(acc, decode(&payload)?);
    }

    if !tree.is_root() {
        transport.concentrate_send(encode(acc)).await?;
        acc = decode(&transport.spread_recv().await?)?;
    }

    for &child in tree.children() {
        transport.spread_send(child, encode(acc)).await?;
    }

    Ok(acc)
}

/// Sum `value` over all ranks; every rank gets the total.
///
/// Collective: every rank must call it, in the same order relative to other
/// collectives.
pub async fn global_sum<T: Transport>(transport: &T, value: u64) -> Result<u64> {
    all_reduce(transport, value, encode_u64, decode_u64, u64::wrapping_add).await
}

/// Combine the exception raised on each rank, if any. Every rank gets the
/// most negative code, or `None` when no rank raised one. Collective.
pub async fn agree_exception<T: Transport>(
    transport: &T,
    local: Option<ExceptionCode>,
) -> Result<Option<ExceptionCode>> {
    all_reduce(
        transport,
        local,
        encode_exception,
        decode_exception,
        ExceptionCode::merge,
    )
    .await
}

/// Wait until every rank has reached the barrier.
pub async fn barrier<T: Transport>(transport: &T) -> Result<()> {
    global_sum(transport, 0).await.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::MemoryNetwork;

    #[tokio::test]
    async fn test_global_sum_every_rank_sees_total() {
        for size in [1usize, 2, 5, 8] {
            let network = MemoryNetwork::new(size);
            let handles: Vec<_> = network
                .transports()
                .into_iter()
                .map(|t| {
                    tokio::spawn(async move {
                        let contribution = u64::from(t.rank().0) + 1;
                        global_sum(&t, contribution).await.unwrap()
                    })
                })
                .collect();

            let expected = (size * (size + 1) / 2) as u64;
            for handle in handles {
                assert_eq!(handle.await.unwrap(), expected);
            }
        }
    }

    #[tokio::test]
    async fn test_barrier_with_wide_tree() {
        let network = MemoryNetwork::with_arity(7, 3);
        let handles: Vec<_> = network
            .transports()
            .into_iter()
            .map(|t| tokio::spawn(async move { barrier(&t).await }))
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
    }

    #[tokio::test]
    async fn test_agree_exception_takes_most_negative() {
        let network = MemoryNetwork::new(6);
        let handles: Vec<_> = network
            .transports()
            .into_iter()
            .map(|t| {
                tokio::spawn(async move {
                    let local = match t.rank().0 {
                        2 => Some(ExceptionCode::OUT_OF_MEMORY),
                        5 => Some(ExceptionCode::CHANNEL_UNAVAILABLE),
                        _ => None,
                    };
                    agree_exception(&t, local).await.unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(
                handle.await.unwrap(),
                Some(ExceptionCode::CHANNEL_UNAVAILABLE)
            );
        }
    }

    #[tokio::test]
    async fn test_agree_exception_without_failures() {
        let network = MemoryNetwork::new(3);
        let handles: Vec<_> = network
            .transports()
            .into_iter()
            .map(|t| tokio::spawn(async move { agree_exception(&t, None).await.unwrap() }))
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), None);
        }
    }

    #[test]
    fn test_exception_payload_rejects_positive_code() {
        assert_eq!(decode_exception(&0i32.to_le_bytes()).unwrap(), None);
        assert_eq!(
            decode_exception(&(-3i32).to_le_bytes()).unwrap(),
            Some(ExceptionCode::OUT_OF_MEMORY)
        );
        assert!(matches!(
            decode_exception(&7i32.to_le_bytes()),
            Err(TransportError::Malformed(_))
        ));
        assert!(decode_exception(&[0u8; 3]).is_err());
    }
}
