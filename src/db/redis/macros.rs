/// Read-through caching for catalog lookups.
///
/// Returns the cached value for `$key` when present. Otherwise awaits `$block`,
/// hands the result to the background writer with `$ttl` seconds to live and
/// returns it. A failed cache read is logged and treated as a miss, so an
/// unreachable Redis only costs the upstream call. Errors from `$block` are
/// propagated with `?`, so the macro must be used inside a function returning
/// `AppResult`.
///
/// # Example
/// ```rust,ignore
/// cached!(self.cache, CacheKey::GenreList(kind), GENRE_CACHE_TTL, async move {
///     self.fetch_genres(kind).await
/// })
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        let hit = match $cache.get_from_cache(&key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, fetching upstream");
                None
            }
        };

        if let Some(cached) = hit {
            tracing::debug!(key = %key, "Cache hit");
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&key, &value, $ttl);
            Ok(value)
        }
    }};
}
