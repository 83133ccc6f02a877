//! S3 Object Source Implementation
//!
//! This module implements the `ObjectSource` trait using S3 as the backend.
//! Listings use `ListObjectsV2` with a delimiter; object bodies are handed
//! out as chunk streams straight from the SDK response, never buffered whole.

use aws_sdk_s3::{
    error::DisplayErrorContext, operation::list_objects_v2::ListObjectsV2Output,
    primitives::ByteStream, Client,
};
use foldzip_domain::{
    archive::{ArchiveError, ChunkStream, Listing, ObjectContent, StorageKey},
    ports::ObjectSource,
};
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, instrument, warn};

/// How listings deal with truncated result pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListingMode {
    /// Follow continuation tokens until the prefix is fully listed
    #[default]
    Paginated,
    /// Keep only the first page (at most 1000 keys per prefix on S3)
    SinglePage,
}

/// S3-based implementation of the ObjectSource port
///
/// The client is cheap to clone and holds no per-request state, so one
/// instance is built at startup and shared by every download.
///
/// ## Configuration
///
/// The source requires:
/// - An S3 bucket name
/// - An AWS SDK S3 Client (configured with region, credentials, endpoint)
///
/// ## Error Handling
///
/// SDK errors become `ArchiveError::Listing` or `ArchiveError::Fetch`, with
/// the full error context in the message.
#[derive(Clone)]
pub struct S3ObjectSource {
    client: Client,
    bucket: String,
    listing_mode: ListingMode,
}

impl S3ObjectSource {
    /// Create a new S3 object source with paginated listings
    ///
    /// # Arguments
    ///
    /// * `client` - Configured AWS S3 client
    /// * `bucket` - Name of the S3 bucket to read from
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use aws_sdk_s3::Client;
    /// use foldzip_s3::infrastructure::{ListingMode, S3ObjectSource};
    ///
    /// fn example(s3_client: Client) -> S3ObjectSource {
    ///     S3ObjectSource::new(s3_client, "photos".to_string())
    ///         .with_listing_mode(ListingMode::Paginated)
    /// }
    /// ```
    pub fn new(client: Client, bucket: String) -> Self {
        info!(bucket = %bucket, "Initializing S3ObjectSource");
        Self {
            client,
            bucket,
            listing_mode: ListingMode::default(),
        }
    }

    pub fn with_listing_mode(mut self, listing_mode: ListingMode) -> Self {
        self.listing_mode = listing_mode;
        self
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn listing_mode(&self) -> ListingMode {
        self.listing_mode
    }
}

/// Fold one `ListObjectsV2` page into a listing
fn merge_page(listing: &mut Listing, page: &ListObjectsV2Output) {
    listing.objects.extend(
        page.contents()
            .iter()
            .filter_map(|object| object.key())
            .map(StorageKey::from),
    );
    listing.common_prefixes.extend(
        page.common_prefixes()
            .iter()
            .filter_map(|prefix| prefix.prefix())
            .map(str::to_string),
    );
}

/// Adapt an SDK body into domain chunks, tagging read errors with the key
fn byte_chunks(key: String, body: ByteStream) -> ChunkStream {
    stream::try_unfold(body, move |mut body| {
        let key = key.clone();
        async move {
            match body.try_next().await {
                Ok(Some(chunk)) => Ok(Some((chunk, body))),
                Ok(None) => Ok(None),
                Err(err) => {
                    error!(key = %key, error = ?err, "Failed to read S3 object body");
                    Err(ArchiveError::fetch(key, err))
                }
            }
        }
    })
    .boxed()
}

impl ObjectSource for S3ObjectSource {
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn list(&self, prefix: &str, delimiter: char) -> Result<Listing, ArchiveError> {
        let mut listing = Listing::default();
        let mut continuation: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = match self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .delimiter(delimiter.to_string())
                .set_continuation_token(continuation.take())
                .send()
                .await
            {
                Ok(page) => page,
                Err(err) => {
                    error!(prefix = %prefix, error = ?err, "Failed to list S3 prefix");
                    return Err(ArchiveError::listing(prefix, DisplayErrorContext(&err)));
                }
            };
            pages += 1;
            merge_page(&mut listing, &page);

            let truncated = page.is_truncated().unwrap_or(false);
            match (page.next_continuation_token(), self.listing_mode) {
                (Some(next), ListingMode::Paginated) if truncated => {
                    continuation = Some(next.to_string());
                }
                (_, ListingMode::SinglePage) if truncated => {
                    warn!(prefix = %prefix, "Listing truncated; remaining pages ignored");
                    break;
                }
                _ => break,
            }
        }

        debug!(
            prefix = %prefix,
            pages,
            objects = listing.objects.len(),
            folders = listing.common_prefixes.len(),
            "Listed S3 prefix"
        );
        Ok(listing)
    }

    #[instrument(skip_all, fields(bucket = %self.bucket, key = %key))]
    async fn get_content(&self, key: &StorageKey) -> Result<Option<ObjectContent>, ArchiveError> {
        debug!("Opening S3 object stream");

        match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await
        {
            Ok(output) => {
                let size = output
                    .content_length()
                    .and_then(|len| u64::try_from(len).ok());
                debug!(size = ?size, "Opened S3 object stream");
                let body = byte_chunks(key.to_string(), output.body);
                Ok(Some(ObjectContent::new(body, size)))
            }
            Err(err) => {
                warn!(error = ?err, "Failed to retrieve object from S3");
                Err(ArchiveError::fetch(key.as_str(), DisplayErrorContext(&err)))
            }
        }
    }
}
