//! Firmware upload engine.
//!
//! A blob goes to the radio in two parts:
//!
//! ```text
//!  blob: |<- HDR_SIZE ->|<-- BULK_SIZE -->|<-- BULK_SIZE -->|<- rest ->|
//!        |   DNLOAD     |   bulk OUT 0x02 |   bulk OUT 0x02 | bulk OUT |
//!        |  (control)   |                 |                 |          |
//! ```
//!
//! The DNLOAD control transfer both switches the radio into download mode
//! and carries the first bytes, so it is always the first transfer. The
//! radio only advances on complete chunks and has no way to resynchronize,
//! so nothing is retried: the first incomplete transfer aborts the upload.

use crate::error::{Error, Result};
use crate::image::Firmware;
use crate::protocol::ath3k::{BULK_SIZE, HDR_SIZE, Request};
use crate::transport::{BULK_OUT_ENDPOINT, Transport};
use log::{debug, trace};

/// Upload a firmware blob.
///
/// `progress` is called with `(bytes_sent, total)` after every completed
/// transfer. On failure the error is [`Error::UploadFailed`] carrying the
/// offset of the chunk that did not go through.
pub fn upload<T, F>(transport: &mut T, firmware: &Firmware, mut progress: F) -> Result<()>
where
    T: Transport + ?Sized,
    F: FnMut(usize, usize),
{
    let data = firmware.data();
    let total = data.len();
    let header = total.min(HDR_SIZE);

    debug!("Uploading {} ({total} bytes)", firmware.name());

    transport
        .control_out(Request::Download.code(), 0, 0, &data[..header])
        .map_err(|e| Error::UploadFailed {
            offset: 0,
            source: Box::new(e),
        })?;
    progress(header, total);

    let mut sent = header;
    for chunk in data[header..].chunks(BULK_SIZE) {
        trace!("Sending {} bytes at offset {sent}", chunk.len());
        transport
            .bulk_out(BULK_OUT_ENDPOINT, chunk)
            .map_err(|e| Error::UploadFailed {
                offset: sent,
                source: Box::new(e),
            })?;
        sent += chunk.len();
        progress(sent, total);
    }

    debug!("{} upload complete", firmware.name());
    Ok(())
}
