use serde::Deserialize;

use super::window::{GlContextId, NativeDrawable};

/// Which graphics backend the retained-mode device renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum RendererKind {
    #[default]
    #[serde(rename = "opengl1")]
    OpenGl1,
    #[serde(rename = "opengles2")]
    OpenGlEs2,
    #[serde(rename = "opengles3")]
    OpenGlEs3,
    #[serde(rename = "direct3d9")]
    Direct3D9,
    #[serde(rename = "gpu")]
    GpuApi,
    #[serde(rename = "gx2")]
    Gx2,
    #[serde(rename = "software")]
    Software,
}

impl RendererKind {
    /// GL-family backends hand the runtime a GL context; the rest bind nothing.
    pub fn uses_gl_context(self) -> bool {
        matches!(
            self,
            RendererKind::OpenGl1 | RendererKind::OpenGlEs2 | RendererKind::OpenGlEs3
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RendererKind::OpenGl1 => "opengl1",
            RendererKind::OpenGlEs2 => "opengles2",
            RendererKind::OpenGlEs3 => "opengles3",
            RendererKind::Direct3D9 => "direct3d9",
            RendererKind::GpuApi => "gpu",
            RendererKind::Gx2 => "gx2",
            RendererKind::Software => "software",
        }
    }
}

/// Graphics data handed to the runtime at session creation. Fixed for the
/// lifetime of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphicsBinding {
    OpenGl {
        /// Drawable pulled from the window's native handle; `None` when the
        /// window exposes none.
        device_context: Option<NativeDrawable>,
        gl_context: GlContextId,
    },
    Unbound,
}

impl GraphicsBinding {
    pub fn resolve(
        kind: RendererKind,
        device_context: Option<NativeDrawable>,
        gl_context: Option<GlContextId>,
    ) -> Self {
        match (kind.uses_gl_context(), gl_context) {
            (true, Some(gl_context)) => GraphicsBinding::OpenGl {
                device_context,
                gl_context,
            },
            _ => GraphicsBinding::Unbound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gl_kinds_bind_context_and_drawable() {
        let b = GraphicsBinding::resolve(
            RendererKind::OpenGlEs3,
            Some(NativeDrawable::Win32Dc(7)),
            Some(GlContextId(9)),
        );
        assert_eq!(
            b,
            GraphicsBinding::OpenGl {
                device_context: Some(NativeDrawable::Win32Dc(7)),
                gl_context: GlContextId(9),
            }
        );
    }

    #[test]
    fn gl_binding_tolerates_missing_drawable() {
        let b = GraphicsBinding::resolve(RendererKind::OpenGl1, None, Some(GlContextId(1)));
        assert!(matches!(
            b,
            GraphicsBinding::OpenGl {
                device_context: None,
                ..
            }
        ));
    }

    #[test]
    fn other_kinds_are_unbound() {
        for kind in [
            RendererKind::Direct3D9,
            RendererKind::GpuApi,
            RendererKind::Gx2,
            RendererKind::Software,
        ] {
            let b = GraphicsBinding::resolve(kind, Some(NativeDrawable::Win32Dc(1)), Some(GlContextId(2)));
            assert_eq!(b, GraphicsBinding::Unbound, "{}", kind.as_str());
        }
    }

    #[test]
    fn renderer_kind_names_round_trip_through_serde() {
        for kind in [RendererKind::OpenGlEs2, RendererKind::Direct3D9, RendererKind::Gx2] {
            let json = format!("\"{}\"", kind.as_str());
            let parsed: RendererKind = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, kind);
        }
    }
}
