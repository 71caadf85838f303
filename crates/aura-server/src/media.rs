use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use aura_core::track::{SourceRef, TrackInfo};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("nothing to search for")]
    EmptyQuery,
    #[error("media index unavailable: {0}")]
    Unavailable(#[from] std::io::Error),
    #[error("media index failed: {0}")]
    Failed(String),
    #[error("unexpected media index output: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("no playable stream for {0}")]
    NoStream(SourceRef),
}

/// External media-indexing service.
#[async_trait]
pub trait MediaIndex: Send + Sync {
    /// Best match for a free-text search or a single-item URL.
    async fn resolve(&self, query: &str) -> Result<Vec<TrackInfo>, ResolveError>;

    /// Every entry of a playlist, in playlist order.
    async fn resolve_playlist(&self, url: &str) -> Result<Vec<TrackInfo>, ResolveError>;

    /// Direct stream URL for a track, looked up right before playback.
    async fn stream_source(&self, source: &SourceRef) -> Result<String, ResolveError>;
}

/// Whether `query` names a playlist rather than a single track.
pub fn is_playlist_url(query: &str) -> bool {
    (query.starts_with("http://") || query.starts_with("https://"))
        && (query.contains("list=") || query.contains("/playlist"))
}

/// Turns user queries into queueable tracks.
#[derive(Clone)]
pub struct TrackResolver {
    index: Arc<dyn MediaIndex>,
}

impl TrackResolver {
    pub fn new(index: Arc<dyn MediaIndex>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> Arc<dyn MediaIndex> {
        Arc::clone(&self.index)
    }

    pub async fn resolve(&self, query: &str) -> Result<Vec<TrackInfo>, ResolveError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResolveError::EmptyQuery);
        }
        let tracks = if is_playlist_url(query) {
            self.index.resolve_playlist(query).await?
        } else {
            self.index.resolve(query).await?
        };
        tracing::debug!(query, found = tracks.len(), "Query resolved");
        Ok(tracks)
    }
}

/// One entry of yt-dlp's `-J` output.
#[derive(Debug, Deserialize)]
struct YtDlpEntry {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    webpage_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    entries: Option<Vec<YtDlpEntry>>,
}

impl YtDlpEntry {
    fn into_track(self) -> Option<TrackInfo> {
        let source = self
            .webpage_url
            .or(self.url)
            .or_else(|| self.id.map(|id| format!("https://www.youtube.com/watch?v={id}")))?;
        let title = self.title.unwrap_or_else(|| source.clone());
        Some(TrackInfo::new(title, source))
    }
}

/// Tracks listed in a yt-dlp JSON dump: the entries of a search or
/// playlist, or the single item itself.
pub fn parse_listing(json: &str) -> Result<Vec<TrackInfo>, ResolveError> {
    let mut root: YtDlpEntry = serde_json::from_str(json)?;
    Ok(match root.entries.take() {
        Some(entries) => entries.into_iter().filter_map(YtDlpEntry::into_track).collect(),
        None => root.into_track().into_iter().collect(),
    })
}

/// The direct stream URL from a yt-dlp `-f bestaudio` dump.
pub fn parse_stream_url(json: &str, source: &SourceRef) -> Result<String, ResolveError> {
    let root: YtDlpEntry = serde_json::from_str(json)?;
    root.url.ok_or_else(|| ResolveError::NoStream(source.clone()))
}

/// [`MediaIndex`] backed by the `yt-dlp` executable.
pub struct YtDlpIndex {
    program: PathBuf,
}

impl YtDlpIndex {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn dump(&self, args: &[&str]) -> Result<String, ResolveError> {
        let output = Command::new(&self.program)
            .args(["--no-warnings", "--quiet", "-J"])
            .args(args)
            .kill_on_drop(true)
            .output()
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr.lines().last().unwrap_or("no output").to_string();
            tracing::warn!(status = %output.status, error = %message, "yt-dlp failed");
            return Err(ResolveError::Failed(message));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl MediaIndex for YtDlpIndex {
    async fn resolve(&self, query: &str) -> Result<Vec<TrackInfo>, ResolveError> {
        let target = if query.starts_with("http://") || query.starts_with("https://") {
            query.to_string()
        } else {
            format!("ytsearch1:{query}")
        };
        let json = self.dump(&["--flat-playlist", target.as_str()]).await?;
        parse_listing(&json)
    }

    async fn resolve_playlist(&self, url: &str) -> Result<Vec<TrackInfo>, ResolveError> {
        let json = self.dump(&["--flat-playlist", "--yes-playlist", url]).await?;
        parse_listing(&json)
    }

    async fn stream_source(&self, source: &SourceRef) -> Result<String, ResolveError> {
        let json = self
            .dump(&["--no-playlist", "-f", "bestaudio", source.0.as_str()])
            .await?;
        parse_stream_url(&json, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playlist_detection() {
        assert!(is_playlist_url(
            "https://www.youtube.com/watch?v=abc&list=PL123"
        ));
        assert!(is_playlist_url("https://www.youtube.com/playlist?list=PL1"));
        assert!(!is_playlist_url("https://www.youtube.com/watch?v=abc"));
        assert!(!is_playlist_url("lofi list= beats"));
    }

    #[test]
    fn parses_search_results() {
        let json = r#"{
            "_type": "playlist",
            "entries": [
                {"id": "abc", "title": "First", "url": "https://youtu.be/abc"},
                {"id": "def", "title": "Second"},
                {"title": "No source"}
            ]
        }"#;
        let tracks = parse_listing(json).unwrap();
        assert_eq!(
            tracks,
            vec![
                TrackInfo::new("First", "https://youtu.be/abc"),
                TrackInfo::new("Second", "https://www.youtube.com/watch?v=def"),
            ]
        );
    }

    #[test]
    fn parses_single_item() {
        let json = r#"{"title": "Song", "webpage_url": "https://example.com/v/1"}"#;
        assert_eq!(
            parse_listing(json).unwrap(),
            vec![TrackInfo::new("Song", "https://example.com/v/1")]
        );
    }

    #[test]
    fn stream_url_required() {
        let source = SourceRef("https://example.com/v/1".into());
        assert_eq!(
            parse_stream_url(r#"{"url": "https://cdn/x.webm"}"#, &source).unwrap(),
            "https://cdn/x.webm"
        );
        assert!(matches!(
            parse_stream_url(r#"{"title": "x"}"#, &source),
            Err(ResolveError::NoStream(_))
        ));
        assert!(matches!(
            parse_stream_url("not json", &source),
            Err(ResolveError::Malformed(_))
        ));
    }

    struct Scripted;

    #[async_trait]
    impl MediaIndex for Scripted {
        async fn resolve(&self, query: &str) -> Result<Vec<TrackInfo>, ResolveError> {
            Ok(vec![TrackInfo::new(query, "search")])
        }

        async fn resolve_playlist(&self, url: &str) -> Result<Vec<TrackInfo>, ResolveError> {
            Ok(vec![TrackInfo::new(url, "p1"), TrackInfo::new(url, "p2")])
        }

        async fn stream_source(&self, source: &SourceRef) -> Result<String, ResolveError> {
            Ok(source.0.clone())
        }
    }

    #[tokio::test]
    async fn resolver_routes_playlists() {
        let resolver = TrackResolver::new(Arc::new(Scripted));
        assert_eq!(resolver.resolve("  lofi  ").await.unwrap().len(), 1);
        assert_eq!(
            resolver
                .resolve("https://youtube.com/playlist?list=X")
                .await
                .unwrap()
                .len(),
            2
        );
        assert!(matches!(
            resolver.resolve("   ").await,
            Err(ResolveError::EmptyQuery)
        ));
    }
}
