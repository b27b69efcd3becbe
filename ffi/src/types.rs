//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`, and
//! tagged enums with explicit discriminants. Conversion functions live here
//! to keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use docstore_core::error::ApiError;
use docstore_core::http::{HttpMethod, HttpResponse};
use docstore_core::{LoginReply, Operation, Reply, Response};

/// Opaque handle to a `DocStoreClient`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiDocStoreClient {
    pub(crate) inner: docstore_core::DocStoreClient,
}

/// Move a Rust string into a C string owned by the caller. Interior NULs
/// cannot be represented and yield an empty string.
pub(crate) fn to_c(s: String) -> *mut c_char {
    CString::new(s).unwrap_or_default().into_raw()
}

/// Borrow a caller-owned C string. `None` for null or invalid UTF-8.
///
/// # Safety
/// A non-null `ptr` must point to a NUL-terminated string that outlives the
/// returned slice.
pub(crate) unsafe fn from_c<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Delete = 3,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Delete => FfiHttpMethod::Delete,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// Built by `docstore_build_*` functions. The host executes the request on
/// its own queue and passes the response back through `docstore_parse_*`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: docstore_core::HttpRequest) -> *mut Self {
        let url = to_c(req.url);
        let body = match req.body {
            Some(b) => to_c(b),
            None => std::ptr::null_mut(),
        };

        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: to_c(k),
                    value: to_c(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url,
            headers,
            headers_len,
            body,
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// A response header supplied by the host. Read, never freed, by this library.
#[repr(C)]
pub struct FfiResponseHeader {
    pub key: *const c_char,
    pub value: *const c_char,
}

/// An HTTP response described as C-compatible plain data.
///
/// The host constructs this after executing a request and passes a pointer
/// to a `docstore_parse_*` function. Headers matter for login, where the
/// session cookie is read from `set-cookie`; they may be null elsewhere.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub headers: *const FfiResponseHeader,
    pub headers_len: u32,
    pub body: *const c_char,
}

impl FfiHttpResponse {
    /// Copy into a core `HttpResponse`. Null or non-UTF-8 header entries are
    /// skipped and a null body reads as empty. `None` if the body is not UTF-8.
    ///
    /// # Safety
    /// Every non-null pointer must be valid for the duration of the call and
    /// `headers` must point to `headers_len` entries.
    pub(crate) unsafe fn to_core(&self) -> Option<HttpResponse> {
        let headers = if self.headers.is_null() || self.headers_len == 0 {
            Vec::new()
        } else {
            unsafe { std::slice::from_raw_parts(self.headers, self.headers_len as usize) }
                .iter()
                .filter_map(|h| unsafe { Some((from_c(h.key)?.to_string(), from_c(h.value)?.to_string())) })
                .collect()
        };
        let body = if self.body.is_null() {
            String::new()
        } else {
            unsafe { from_c(self.body) }?.to_string()
        };
        Some(HttpResponse {
            status: self.status,
            headers,
            body,
        })
    }
}

/// Tagged operation selector for `docstore_parse_response`.
#[repr(C)]
#[derive(Clone, Copy)]
pub enum FfiOperation {
    CreateDatabase = 0,
    DeleteDatabase = 1,
    ReadDocument = 2,
    CreateDocument = 3,
    UpdateDocument = 4,
    DeleteDocument = 5,
}

impl From<FfiOperation> for Operation {
    fn from(op: FfiOperation) -> Self {
        match op {
            FfiOperation::CreateDatabase => Operation::CreateDatabase,
            FfiOperation::DeleteDatabase => Operation::DeleteDatabase,
            FfiOperation::ReadDocument => Operation::ReadDocument,
            FfiOperation::CreateDocument => Operation::CreateDocument,
            FfiOperation::UpdateDocument => Operation::UpdateDocument,
            FfiOperation::DeleteDocument => Operation::DeleteDocument,
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiDocResult`.
#[repr(C)]
pub enum FfiErrorCode {
    Ok = 0,
    NotFound = 1,
    Conflict = 2,
    Unauthorized = 3,
    Http = 4,
    MissingCookie = 5,
    MissingArgument = 6,
    Deserialization = 7,
    Serialization = 8,
    Transport = 9,
    Panic = 10,
    NullArg = 11,
    InvalidArg = 12,
}

/// Tag that tells `docstore_free_result` what `FfiDocResult::data` points to.
#[repr(C)]
pub enum FfiDataTag {
    None = 0,
    Login = 1,
    Status = 2,
    Document = 3,
    Revision = 4,
}

/// Decoded login reply. `name` may be null.
#[repr(C)]
pub struct FfiLogin {
    pub ok: bool,
    pub name: *mut c_char,
}

/// Decoded database create/delete reply.
#[repr(C)]
pub struct FfiStatus {
    pub ok: bool,
}

/// A document read from the store, re-encoded as compact JSON.
#[repr(C)]
pub struct FfiDocument {
    pub json: *mut c_char,
}

/// Id and revision returned by a document mutation.
#[repr(C)]
pub struct FfiRevision {
    pub ok: bool,
    pub id: *mut c_char,
    pub rev: *mut c_char,
}

/// Result envelope for all parse operations.
///
/// On success `error_code` is `Ok`, `error_message` is null, `tag` holds the
/// resolved operation tag (null for login/logout), `body` the raw response
/// body, and `data` the decoded payload (tagged by `data_tag`).
/// On failure `error_code` describes the category, `error_message` is a
/// human-readable C string, and `tag`, `body` and `data` are null.
#[repr(C)]
pub struct FfiDocResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub tag: *mut c_char,
    pub body: *mut c_char,
    pub data_tag: FfiDataTag,
    pub data: *mut std::ffi::c_void,
}

impl FfiDocResult {
    fn ok(tag: Option<String>, body: Option<String>, data_tag: FfiDataTag, data: *mut std::ffi::c_void) -> *mut Self {
        Box::into_raw(Box::new(FfiDocResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            tag: tag.map(to_c).unwrap_or(std::ptr::null_mut()),
            body: body.map(to_c).unwrap_or(std::ptr::null_mut()),
            data_tag,
            data,
        }))
    }

    /// Build a success result carrying an `FfiLogin`.
    pub(crate) fn ok_login(reply: LoginReply) -> *mut Self {
        let login = Box::new(FfiLogin {
            ok: reply.ok,
            name: reply.name.map(to_c).unwrap_or(std::ptr::null_mut()),
        });
        Self::ok(None, None, FfiDataTag::Login, Box::into_raw(login) as *mut std::ffi::c_void)
    }

    /// Build a success result carrying the decoded payload of a tagged reply.
    pub(crate) fn ok_reply(reply: Reply) -> *mut Self {
        let (data_tag, data) = match reply.response {
            Response::DatabaseCreated(status) | Response::DatabaseDeleted(status) => (
                FfiDataTag::Status,
                Box::into_raw(Box::new(FfiStatus { ok: status.ok })) as *mut std::ffi::c_void,
            ),
            Response::DocumentRead(doc) => (
                FfiDataTag::Document,
                Box::into_raw(Box::new(FfiDocument {
                    json: to_c(serde_json::Value::Object(doc).to_string()),
                })) as *mut std::ffi::c_void,
            ),
            Response::DocumentCreated(rev) | Response::DocumentUpdated(rev) | Response::DocumentDeleted(rev) => (
                FfiDataTag::Revision,
                Box::into_raw(Box::new(FfiRevision {
                    ok: rev.ok,
                    id: to_c(rev.id),
                    rev: to_c(rev.rev),
                })) as *mut std::ffi::c_void,
            ),
        };
        Self::ok(Some(reply.tag), Some(reply.body), data_tag, data)
    }

    /// Build a success result with no data payload (e.g. logout).
    pub(crate) fn ok_empty() -> *mut Self {
        Self::ok(None, None, FfiDataTag::None, std::ptr::null_mut())
    }

    fn failure(error_code: FfiErrorCode, http_status: u16, msg: String) -> *mut Self {
        Box::into_raw(Box::new(FfiDocResult {
            error_code,
            error_message: to_c(msg),
            http_status,
            tag: std::ptr::null_mut(),
            body: std::ptr::null_mut(),
            data_tag: FfiDataTag::None,
            data: std::ptr::null_mut(),
        }))
    }

    /// Build an error result from an `ApiError`.
    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let code = match &err {
            ApiError::NotFound => FfiErrorCode::NotFound,
            ApiError::Conflict => FfiErrorCode::Conflict,
            ApiError::Unauthorized => FfiErrorCode::Unauthorized,
            ApiError::HttpError { .. } => FfiErrorCode::Http,
            ApiError::MissingCookie => FfiErrorCode::MissingCookie,
            ApiError::MissingArgument(_) => FfiErrorCode::MissingArgument,
            ApiError::DeserializationError(_) => FfiErrorCode::Deserialization,
            ApiError::SerializationError(_) => FfiErrorCode::Serialization,
            ApiError::Transport(_) => FfiErrorCode::Transport,
        };
        Self::failure(code, err.status().unwrap_or(0), err.to_string())
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::failure(FfiErrorCode::NullArg, 0, format!("null argument: {name}"))
    }

    /// Build an error result for an argument that is not valid UTF-8.
    pub(crate) fn invalid_arg(name: &str) -> *mut Self {
        Self::failure(FfiErrorCode::InvalidArg, 0, format!("argument is not valid UTF-8: {name}"))
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::failure(FfiErrorCode::Panic, 0, msg.to_string())
    }
}
