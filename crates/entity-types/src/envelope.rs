use serde::Serialize;

/// The response envelope every external surface wraps engine results in
/// (§6). Not used internally by the kernel — callers at the HTTP edge
/// apply it.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Envelope<T: Serialize> {
    Ok {
        success: bool,
        data: T,
        #[serde(skip_serializing_if = "Option::is_none")]
        meta: Option<serde_json::Value>,
    },
    Err {
        success: bool,
        error: String,
    },
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self::Ok {
            success: true,
            data,
            meta: None,
        }
    }

    pub fn ok_with_meta(data: T, meta: serde_json::Value) -> Self {
        Self::Ok {
            success: true,
            data,
            meta: Some(meta),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self::Err {
            success: false,
            error: message.into(),
        }
    }
}
