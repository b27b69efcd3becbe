//! C-ABI wrapper around `docstore-core`.
//!
//! # Overview
//! Exposes the session, database and document operations through
//! `extern "C"` functions so a mobile host can build requests, run them on
//! its own HTTP queue, and hand the responses back for parsing without
//! linking to Rust's async runtime.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - One `docstore_build_*` per operation; parsing is `docstore_parse_login`,
//!   `docstore_parse_logout`, and `docstore_parse_response` selected by
//!   `FfiOperation`.
//! - A single `FfiDocResult` envelope with `FfiDataTag` + `void* data`
//!   conveys success payloads and errors uniformly.
//! - The host owns all returned pointers and must call the matching
//!   `docstore_free_*` function to release them.

pub mod types;

use std::ffi::CString;
use std::os::raw::c_char;
use std::panic::catch_unwind;

use docstore_core::{Operation, Reply};

use types::*;

/// Parse a caller-supplied JSON document; `None` on null, non-UTF-8 or
/// invalid JSON.
fn json_arg(ptr: *const c_char) -> Option<serde_json::Value> {
    serde_json::from_str(unsafe { from_c(ptr) }?).ok()
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a new client bound to `base_url`, with no session.
///
/// Returns null if `base_url` is null, not valid UTF-8, or if an internal
/// panic occurs. The caller must free the returned pointer with
/// `docstore_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn docstore_client_new(base_url: *const c_char) -> *mut FfiDocStoreClient {
    catch_unwind(|| {
        let Some(url) = (unsafe { from_c(base_url) }) else {
            return std::ptr::null_mut();
        };
        let client = docstore_core::DocStoreClient::new(url);
        Box::into_raw(Box::new(FfiDocStoreClient { inner: client }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `docstore_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn docstore_client_free(client: *mut FfiDocStoreClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

/// Current session cookie, or null before a successful login.
/// Free with `docstore_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn docstore_client_cookie(client: *const FfiDocStoreClient) -> *mut c_char {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        match client.inner.session().cookie() {
            Some(cookie) => to_c(cookie.to_string()),
            None => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Build request functions
//
// Every string argument must be non-null and valid UTF-8; otherwise the
// builder returns null instead of a request.
// ---------------------------------------------------------------------------

/// Build the login request. Returns null on a null or non-UTF-8 argument.
/// The caller must free the returned pointer with `docstore_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn docstore_build_login(
    client: *const FfiDocStoreClient,
    name: *const c_char,
    password: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let (Some(name), Some(password)) = (unsafe { from_c(name) }, unsafe { from_c(password) }) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        FfiHttpRequest::from_core(client.inner.build_login(name, password))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build the logout request. Returns null if `client` is null.
#[unsafe(no_mangle)]
pub extern "C" fn docstore_build_logout(client: *const FfiDocStoreClient) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        FfiHttpRequest::from_core(client.inner.build_logout())
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build a database creation request. Returns null on a null or non-UTF-8
/// argument.
#[unsafe(no_mangle)]
pub extern "C" fn docstore_build_create_database(
    client: *const FfiDocStoreClient,
    name: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let Some(name) = (unsafe { from_c(name) }) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        FfiHttpRequest::from_core(client.inner.build_create_database(name))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build a database deletion request. Returns null on a null or non-UTF-8
/// argument.
#[unsafe(no_mangle)]
pub extern "C" fn docstore_build_delete_database(
    client: *const FfiDocStoreClient,
    name: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let Some(name) = (unsafe { from_c(name) }) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        FfiHttpRequest::from_core(client.inner.build_delete_database(name))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build a document read request. Returns null on a null or non-UTF-8
/// argument.
#[unsafe(no_mangle)]
pub extern "C" fn docstore_build_read_document(
    client: *const FfiDocStoreClient,
    database: *const c_char,
    id: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let (Some(database), Some(id)) = (unsafe { from_c(database) }, unsafe { from_c(id) }) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        FfiHttpRequest::from_core(client.inner.build_read_document(database, id))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build a document insert request from a JSON object string.
///
/// Returns null on a null or non-UTF-8 argument, or if `json` is not a JSON
/// object.
#[unsafe(no_mangle)]
pub extern "C" fn docstore_build_create_document(
    client: *const FfiDocStoreClient,
    database: *const c_char,
    json: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let (Some(database), Some(item)) = (unsafe { from_c(database) }, json_arg(json)) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        match client.inner.build_create_document(database, &item) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build a document update request against revision `rev`.
///
/// Returns null on a null or non-UTF-8 argument, an empty `id` or `rev`, or
/// if `json` is not a JSON object.
#[unsafe(no_mangle)]
pub extern "C" fn docstore_build_update_document(
    client: *const FfiDocStoreClient,
    database: *const c_char,
    json: *const c_char,
    id: *const c_char,
    rev: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let (Some(database), Some(id), Some(rev)) = (unsafe { (from_c(database), from_c(id), from_c(rev)) }) else {
            return std::ptr::null_mut();
        };
        let Some(item) = json_arg(json) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        match client.inner.build_update_document(database, &item, id, rev) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build a document delete request against revision `rev`.
///
/// Returns null on a null or non-UTF-8 argument, or an empty `id`/`rev`.
#[unsafe(no_mangle)]
pub extern "C" fn docstore_build_delete_document(
    client: *const FfiDocStoreClient,
    database: *const c_char,
    id: *const c_char,
    rev: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let (Some(database), Some(id), Some(rev)) = (unsafe { (from_c(database), from_c(id), from_c(rev)) }) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        match client.inner.build_delete_document(database, id, rev) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Parse response functions
// ---------------------------------------------------------------------------

/// Parse a login response and store its session cookie in `client`.
///
/// Returns a result with `data_tag = Login` on success.
#[unsafe(no_mangle)]
pub extern "C" fn docstore_parse_login(
    client: *const FfiDocStoreClient,
    response: *const FfiHttpResponse,
) -> *mut FfiDocResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiDocResult::null_arg("client");
        }
        if response.is_null() {
            return FfiDocResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let Some(core_resp) = (unsafe { (*response).to_core() }) else {
            return FfiDocResult::invalid_arg("response");
        };
        match client.inner.parse_login(core_resp) {
            Ok(reply) => FfiDocResult::ok_login(reply),
            Err(e) => FfiDocResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiDocResult::panic("panic in docstore_parse_login"))
}

/// Parse a logout response. Returns a result with `data_tag = None`.
#[unsafe(no_mangle)]
pub extern "C" fn docstore_parse_logout(
    client: *const FfiDocStoreClient,
    response: *const FfiHttpResponse,
) -> *mut FfiDocResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiDocResult::null_arg("client");
        }
        if response.is_null() {
            return FfiDocResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let Some(core_resp) = (unsafe { (*response).to_core() }) else {
            return FfiDocResult::invalid_arg("response");
        };
        match client.inner.parse_logout(core_resp) {
            Ok(()) => FfiDocResult::ok_empty(),
            Err(e) => FfiDocResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiDocResult::panic("panic in docstore_parse_logout"))
}

/// Parse the response of a tagged operation.
///
/// `tag` may be null, in which case the operation's default tag is used.
/// On success `tag` and `body` are set and `data` holds the decoded payload.
#[unsafe(no_mangle)]
pub extern "C" fn docstore_parse_response(
    client: *const FfiDocStoreClient,
    operation: FfiOperation,
    tag: *const c_char,
    response: *const FfiHttpResponse,
) -> *mut FfiDocResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiDocResult::null_arg("client");
        }
        if response.is_null() {
            return FfiDocResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let operation = Operation::from(operation);
        let tag = if tag.is_null() {
            None
        } else {
            match unsafe { from_c(tag) } {
                Some(tag) => Some(tag),
                None => return FfiDocResult::invalid_arg("tag"),
            }
        };
        let Some(core_resp) = (unsafe { (*response).to_core() }) else {
            return FfiDocResult::invalid_arg("response");
        };
        match client.inner.parse_response(operation, &core_resp) {
            Ok(decoded) => FfiDocResult::ok_reply(Reply {
                tag: operation.resolve_tag(tag),
                body: core_resp.body,
                response: decoded,
            }),
            Err(e) => FfiDocResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiDocResult::panic("panic in docstore_parse_response"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by any `docstore_build_*` function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn docstore_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        free_c(req.url);
        free_c(req.body);
        if !req.headers.is_null() && req.headers_len > 0 {
            let headers = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(req.headers, req.headers_len as usize))
            };
            for h in headers.iter() {
                free_c(h.key);
                free_c(h.value);
            }
        }
    });
}

/// Free an `FfiDocResult` returned by any `docstore_parse_*` function.
/// Safe to call with null. Uses `data_tag` to determine what `data` points to.
#[unsafe(no_mangle)]
pub extern "C" fn docstore_free_result(result: *mut FfiDocResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        free_c(result.error_message);
        free_c(result.tag);
        free_c(result.body);
        if !result.data.is_null() {
            match result.data_tag {
                FfiDataTag::Login => {
                    let login = unsafe { Box::from_raw(result.data as *mut FfiLogin) };
                    free_c(login.name);
                }
                FfiDataTag::Status => {
                    drop(unsafe { Box::from_raw(result.data as *mut FfiStatus) });
                }
                FfiDataTag::Document => {
                    let doc = unsafe { Box::from_raw(result.data as *mut FfiDocument) };
                    free_c(doc.json);
                }
                FfiDataTag::Revision => {
                    let rev = unsafe { Box::from_raw(result.data as *mut FfiRevision) };
                    free_c(rev.id);
                    free_c(rev.rev);
                }
                FfiDataTag::None => {}
            }
        }
    });
}

/// Release a C string produced by `to_c`, ignoring null.
fn free_c(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn docstore_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| free_c(s));
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
