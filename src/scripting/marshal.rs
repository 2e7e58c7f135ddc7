//! 状态封送：宿主 JSON / 字节缓冲区 <-> 脚本值
//!
//! 状态在每次调用开始时从 JSON 解码，结束时重新编码；运行时不保留任何状态。
//! 字节缓冲区以零拷贝的 ArrayBuffer 视图交给脚本，脚本直接读写宿主内存；
//! 调用返回前必须 detach，之后脚本保留的引用只能看到长度为 0 的缓冲区。

use rquickjs::{qjs, ArrayBuffer, Ctx, FromJs, Value};

use crate::core::error::{MarshalError, MarshalResult};
use crate::core::limits::{Limit, MAX_JSON_LENGTH};
use crate::scripting::exception::describe_pending;

const PREVIEW_BYTES: usize = 4096;

fn preview(json: &str) -> String {
    if json.len() <= PREVIEW_BYTES {
        return json.to_string();
    }
    let mut end = PREVIEW_BYTES;
    while !json.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... ({} bytes total)", &json[..end], json.len())
}

/// 解码宿主提供的状态 JSON
pub fn decode_state<'js>(ctx: &Ctx<'js>, state_json: &str) -> MarshalResult<Value<'js>> {
    match ctx.json_parse(state_json) {
        Ok(value) => Ok(value),
        Err(e) => {
            let reason = describe_pending(ctx, e);
            tracing::debug!(target: "brain", %reason, "state JSON rejected by parser");
            Err(MarshalError::InvalidState {
                json: preview(state_json),
            })
        }
    }
}

/// 把宿主字节以零拷贝视图交给脚本
///
/// # Safety
///
/// The returned buffer aliases `bytes`. The caller must call
/// [`ArrayBuffer::detach`] on it before `bytes` is used again or goes out
/// of scope.
pub unsafe fn wrap_host_buffer<'js>(ctx: &Ctx<'js>, bytes: &mut [u8]) -> MarshalResult<ArrayBuffer<'js>> {
    Limit::Buffer
        .check_len(bytes.len())
        .map_err(|_| MarshalError::BufferTooLarge {
            actual: bytes.len(),
            max: Limit::Buffer.max_bytes(),
        })?;

    // No free function: the memory stays owned by the host.
    let raw = qjs::JS_NewArrayBuffer(
        ctx.as_raw().as_ptr(),
        bytes.as_mut_ptr(),
        bytes.len() as _,
        None,
        std::ptr::null_mut(),
        0,
    );
    let value = Value::from_raw(ctx.clone(), raw);
    if value.is_exception() {
        return Err(MarshalError::Unserializable {
            reason: describe_pending(ctx, rquickjs::Error::Exception),
        });
    }
    ArrayBuffer::from_js(ctx, value).map_err(|e| MarshalError::Unserializable {
        reason: describe_pending(ctx, e),
    })
}

/// 把调用结束后的状态重新编码为 JSON
pub fn encode_state<'js>(ctx: &Ctx<'js>, state: Value<'js>) -> MarshalResult<String> {
    let json = match ctx.json_stringify(state) {
        Ok(Some(json)) => json.to_string().map_err(|e| MarshalError::Unserializable {
            reason: describe_pending(ctx, e),
        })?,
        Ok(None) => {
            return Err(MarshalError::Unserializable {
                reason: "value has no JSON representation".to_string(),
            })
        }
        Err(e) => {
            return Err(MarshalError::Unserializable {
                reason: describe_pending(ctx, e),
            })
        }
    };

    if json.len() > MAX_JSON_LENGTH {
        return Err(MarshalError::ResultTooLarge {
            actual: json.len(),
            max: MAX_JSON_LENGTH,
        });
    }
    Ok(json)
}
