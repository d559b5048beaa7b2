use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use crate::sender::SendError;

/// Opens attachment files on behalf of a send call.
///
/// Whatever `File` the source hands out is owned by an [`AttachmentHandle`]
/// and closed when that handle is dropped.
pub trait AttachmentSource {
    type File: Read;

    fn open(&self, path: &str) -> Result<Self::File, SendError>;
}

/// Attachment source backed by the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsAttachments;

impl AttachmentSource for FsAttachments {
    type File = File;

    fn open(&self, path: &str) -> Result<File, SendError> {
        let expanded = shellexpand::tilde(path).into_owned();

        match fs::metadata(&expanded) {
            Ok(meta) if meta.is_file() => {}
            _ => return Err(SendError::AttachmentNotFound(path.to_string())),
        }

        File::open(&expanded).map_err(|source| SendError::AttachmentUnreadable {
            path: path.to_string(),
            source,
        })
    }
}

/// An open attachment, bound to a single outgoing message.
#[derive(Debug)]
pub struct AttachmentHandle<F> {
    path: String,
    filename: String,
    content_type: String,
    file: F,
}

impl<F: Read> AttachmentHandle<F> {
    pub fn new(path: &str, file: F) -> Self {
        let filename = Path::new(path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());
        let content_type = mime_guess::from_path(&filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Self {
            path: path.to_string(),
            filename,
            content_type,
            file,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn read_contents(&mut self) -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        self.file.read_to_end(&mut data)?;
        Ok(data)
    }
}

/// Open every path in order, stopping at the first one that is not a regular file.
///
/// Handles opened before a failure are dropped before the error is returned.
pub fn validate_attachments<S: AttachmentSource>(
    source: &S,
    paths: &[String],
) -> Result<Vec<AttachmentHandle<S::File>>, SendError> {
    let mut handles = Vec::with_capacity(paths.len());

    for path in paths {
        let file = source.open(path)?;
        log::debug!("Attachment accepted: {}", path);
        handles.push(AttachmentHandle::new(path, file));
    }

    Ok(handles)
}
