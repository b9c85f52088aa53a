//! `multipart/form-data` bodies.
//!
//! A [`Form`] keeps its fields in insertion order; that order is used both when
//! predicting the encoded length and when streaming the body. File-backed
//! fields are read from disk lazily, part by part, while the body is written.

use std::{
    borrow::Cow,
    io,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use bytes::Bytes;
use futures_io::AsyncWrite;
use futures_util::{AsyncWriteExt, Stream, StreamExt, stream};

/// A file on disk, loaded when the body is written.
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
    filename: Cow<'static, str>,
    content_type: Cow<'static, str>,
    size: Option<u64>,
}

impl File {
    /// Reference a file. The filename is the path's basename and the content
    /// type is guessed from its extension.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .essence_str()
            .to_owned();
        Self {
            path,
            filename: filename.into(),
            content_type: content_type.into(),
            size: None,
        }
    }

    /// Declare the file size so the body length can be computed up front.
    #[must_use]
    pub const fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Override the filename sent in `Content-Disposition`.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<Cow<'static, str>>) -> Self {
        self.filename = filename.into();
        self
    }

    /// Override the guessed content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<Cow<'static, str>>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> io::Result<Bytes> {
        let data = async_fs::read(&self.path).await?;
        if let Some(expected) = self.size
            && expected != data.len() as u64
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "{} is {} bytes but was declared as {expected}",
                    self.path.display(),
                    data.len()
                ),
            ));
        }
        Ok(Bytes::from(data))
    }
}

/// In-memory file content.
#[derive(Debug, Clone)]
pub struct Data {
    filename: Cow<'static, str>,
    content_type: Cow<'static, str>,
    data: Bytes,
}

impl Data {
    /// Create file-like content with filename and content type metadata.
    pub fn new(
        filename: impl Into<Cow<'static, str>>,
        content_type: impl Into<Cow<'static, str>>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }
}

/// Value of a single form field.
#[derive(Debug, Clone)]
pub enum Value {
    /// Plain text field.
    Text(String),
    /// File read from disk.
    File(File),
    /// In-memory file content.
    Data(Data),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<File> for Value {
    fn from(value: File) -> Self {
        Self::File(value)
    }
}

impl From<Data> for Value {
    fn from(value: Data) -> Self {
        Self::Data(value)
    }
}

/// Ordered set of form fields.
#[derive(Debug, Clone, Default)]
pub struct Form {
    fields: Vec<(String, Value)>,
}

impl Form {
    /// Create an empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field (builder-style).
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    /// Push a field.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Fields in insertion order.
    #[must_use]
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// Exact encoded length, or `None` when a file's size is not known without I/O.
    #[must_use]
    pub fn encoded_len(&self, boundary: &str) -> Option<u64> {
        let mut total = 0_u64;
        for (name, value) in &self.fields {
            let payload = match value {
                Value::Text(text) => text.len() as u64,
                Value::Data(data) => data.data.len() as u64,
                Value::File(file) => file.size?,
            };
            total += part_head(boundary, name, value, payload).len() as u64 + payload + 2;
        }
        Some(total + closing(boundary).len() as u64)
    }

    /// Stream the encoded body chunk by chunk, one part at a time.
    pub fn stream(&self, boundary: &str) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        let boundary = boundary.to_owned();
        let tail = Bytes::from(closing(&boundary));
        stream::iter(self.fields.clone())
            .then(move |(name, value)| {
                let boundary = boundary.clone();
                async move { encode_part(&boundary, &name, &value).await }
            })
            .chain(stream::once(async move { Ok(tail) }))
    }

    /// Write the encoded body into `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or the sink rejects a write.
    pub async fn write<W: AsyncWrite + Unpin>(&self, sink: &mut W, boundary: &str) -> io::Result<()> {
        let mut chunks = Box::pin(self.stream(boundary));
        while let Some(chunk) = chunks.next().await {
            sink.write_all(&chunk?).await?;
        }
        sink.flush().await
    }

    /// Encode the whole body into memory.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read.
    pub async fn encode(&self, boundary: &str) -> io::Result<Vec<u8>> {
        let mut body = Vec::new();
        self.write(&mut body, boundary).await?;
        Ok(body)
    }
}

async fn encode_part(boundary: &str, name: &str, value: &Value) -> io::Result<Bytes> {
    let payload = match value {
        Value::Text(text) => Bytes::from(text.clone()),
        Value::Data(data) => data.data.clone(),
        Value::File(file) => file.load().await?,
    };
    let head = part_head(boundary, name, value, payload.len() as u64);
    let mut part = Vec::with_capacity(head.len() + payload.len() + 2);
    part.extend_from_slice(head.as_bytes());
    part.extend_from_slice(&payload);
    part.extend_from_slice(b"\r\n");
    Ok(Bytes::from(part))
}

fn part_head(boundary: &str, name: &str, value: &Value, payload_len: u64) -> String {
    let name = escape_quoted(name);
    let (filename, content_type) = match value {
        Value::Text(_) => {
            return format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n"
            );
        }
        Value::File(file) => (&file.filename, &file.content_type),
        Value::Data(data) => (&data.filename, &data.content_type),
    };
    let filename = escape_quoted(filename);
    format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
         Content-Length: {payload_len}\r\nContent-Type: {content_type}\r\n\r\n"
    )
}

/// Percent-encode `"`, CR and LF for a quoted `Content-Disposition` parameter.
fn escape_quoted(value: &str) -> Cow<'_, str> {
    if !value.contains(['"', '\r', '\n']) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 6);
    for ch in value.chars() {
        match ch {
            '"' => escaped.push_str("%22"),
            '\r' => escaped.push_str("%0D"),
            '\n' => escaped.push_str("%0A"),
            _ => escaped.push(ch),
        }
    }
    Cow::Owned(escaped)
}

fn closing(boundary: &str) -> String {
    format!("--{boundary}--\r\n")
}

/// A fresh boundary string.
#[must_use]
pub fn default_boundary() -> String {
    format!("restwave-{:#x}", monotonic_suffix())
}

fn monotonic_suffix() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or_else(|_| 0, |duration| duration.as_micros())
}
