//! The gl-matrix runtime: import preamble, helper object and the mapping
//! from GLSL built-ins to runtime calls.

use glslx_ir::Builtin;

/// npm package the emitted module imports.
pub const RUNTIME_PACKAGE: &str = "gl-matrix";

/// Supported version range of [`RUNTIME_PACKAGE`].
pub const RUNTIME_VERSION: &str = "3.4.x";

/// Emitted before every module. Vectors and matrices are gl-matrix
/// `Float32Array`s; matrices are column-major.
pub const PREAMBLE: &str = r#"import { vec2, vec3, vec4, mat2, mat3, mat4 } from "gl-matrix";

const glsl = {
  splat(n, value) {
    return new Float32Array(n).fill(value);
  },
  vector(n, ...parts) {
    const out = new Float32Array(n);
    let k = 0;
    for (const part of parts) {
      for (const value of typeof part === "number" ? [part] : part) {
        if (k < n) out[k++] = value;
      }
    }
    return out;
  },
  matrix(n, ...parts) {
    if (parts.length === 1 && typeof parts[0] === "number") {
      const out = new Float32Array(n * n);
      for (let i = 0; i < n; i++) out[i * n + i] = parts[0];
      return out;
    }
    return glsl.vector(n * n, ...parts);
  },
  resize(n, m, source) {
    const out = new Float32Array(n * n);
    for (let c = 0; c < n; c++) {
      for (let r = 0; r < n; r++) {
        out[c * n + r] = c < m && r < m ? source[c * m + r] : c === r ? 1 : 0;
      }
    }
    return out;
  },
  swizzle(v, ...indices) {
    return Float32Array.from(indices, (i) => v[i]);
  },
  assignSwizzle(v, indices, value) {
    indices.forEach((i, k) => {
      v[i] = typeof value === "number" ? value : value[k];
    });
    return value;
  },
  column(m, n, i) {
    return m.slice(i * n, i * n + n);
  },
  setColumn(m, n, i, value) {
    m.set(value, i * n);
    return value;
  },
  map(f, ...args) {
    if (args.every((a) => typeof a === "number")) return f(...args);
    const n = Math.max(...args.map((a) => (typeof a === "number" ? 1 : a.length)));
    const out = new Float32Array(n);
    for (let i = 0; i < n; i++) {
      out[i] = f(...args.map((a) => (typeof a === "number" ? a : a[i])));
    }
    return out;
  },
  mul: (a, b) => a * b,
  dot(a, b) {
    if (typeof a === "number") return a * b;
    let sum = 0;
    for (let i = 0; i < a.length; i++) sum += a[i] * b[i];
    return sum;
  },
  distance: (a, b) => Math.abs(a - b),
  radians: (x) => (x * Math.PI) / 180,
  degrees: (x) => (x * 180) / Math.PI,
  atan: (y, x) => (x === undefined ? Math.atan(y) : Math.atan2(y, x)),
  exp2: (x) => 2 ** x,
  inversesqrt: (x) => 1 / Math.sqrt(x),
  fract: (x) => x - Math.floor(x),
  mod: (x, y) => x - y * Math.floor(x / y),
  clamp: (x, lo, hi) => Math.min(Math.max(x, lo), hi),
  mix: (a, b, t) => a * (1 - t) + b * t,
  step: (edge, x) => (x < edge ? 0 : 1),
  smoothstep(e0, e1, x) {
    const t = glsl.clamp((x - e0) / (e1 - e0), 0, 1);
    return t * t * (3 - 2 * t);
  },
  faceforward(n, i, nref) {
    return glsl.map((a) => (glsl.dot(nref, i) < 0 ? a : -a), n);
  },
  reflect(i, n) {
    const d = 2 * glsl.dot(n, i);
    return glsl.map((a, b) => a - d * b, i, n);
  },
  refract(i, n, eta) {
    const d = glsl.dot(n, i);
    const k = 1 - eta * eta * (1 - d * d);
    if (k < 0) return glsl.map(() => 0, i);
    return glsl.map((a, b) => eta * a - (eta * d + Math.sqrt(k)) * b, i, n);
  },
};
"#;

/// How a built-in is invoked for one operand shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimeCall {
    /// A plain call, e.g. `Math.sin(x)`.
    Function(&'static str),
    /// A scalar function applied per component through `glsl.map`.
    Map(&'static str),
    /// `vecN.name(vecN.create(), args...)`
    VectorOut(&'static str),
    /// `vecN.name(args...)` returning a number.
    VectorValue(&'static str),
    /// `matN.name(matN.create(), args...)`
    MatrixOut(&'static str),
    /// `matN.name(args...)` returning a number.
    MatrixValue(&'static str),
}

/// The runtime calls of one built-in, per operand shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mapping {
    pub scalar: Option<RuntimeCall>,
    pub vector: Option<RuntimeCall>,
    pub matrix: Option<RuntimeCall>,
}

const fn both(scalar: &'static str, vector: RuntimeCall) -> Mapping {
    Mapping {
        scalar: Some(RuntimeCall::Function(scalar)),
        vector: Some(vector),
        matrix: None,
    }
}

/// The same scalar function for scalars and, mapped, for vectors.
const fn component_wise(function: &'static str) -> Mapping {
    both(function, RuntimeCall::Map(function))
}

const fn matrix_only(call: RuntimeCall) -> Mapping {
    Mapping {
        scalar: None,
        vector: None,
        matrix: Some(call),
    }
}

/// The runtime mapping of `builtin`.
pub fn mapping(builtin: Builtin) -> Mapping {
    use RuntimeCall::*;

    match builtin {
        Builtin::Radians => component_wise("glsl.radians"),
        Builtin::Degrees => component_wise("glsl.degrees"),
        Builtin::Sin => component_wise("Math.sin"),
        Builtin::Cos => component_wise("Math.cos"),
        Builtin::Tan => component_wise("Math.tan"),
        Builtin::Asin => component_wise("Math.asin"),
        Builtin::Acos => component_wise("Math.acos"),
        Builtin::Atan => component_wise("glsl.atan"),
        Builtin::Sinh => component_wise("Math.sinh"),
        Builtin::Cosh => component_wise("Math.cosh"),
        Builtin::Tanh => component_wise("Math.tanh"),
        Builtin::Pow => component_wise("Math.pow"),
        Builtin::Exp => component_wise("Math.exp"),
        Builtin::Log => component_wise("Math.log"),
        Builtin::Exp2 => component_wise("glsl.exp2"),
        Builtin::Log2 => component_wise("Math.log2"),
        Builtin::Sqrt => component_wise("Math.sqrt"),
        Builtin::InverseSqrt => component_wise("glsl.inversesqrt"),
        Builtin::Abs => component_wise("Math.abs"),
        Builtin::Sign => component_wise("Math.sign"),
        Builtin::Floor => both("Math.floor", VectorOut("floor")),
        Builtin::Ceil => both("Math.ceil", VectorOut("ceil")),
        Builtin::Round => both("Math.round", VectorOut("round")),
        Builtin::Trunc => component_wise("Math.trunc"),
        Builtin::Fract => component_wise("glsl.fract"),
        Builtin::Mod => component_wise("glsl.mod"),
        Builtin::Min => both("Math.min", VectorOut("min")),
        Builtin::Max => both("Math.max", VectorOut("max")),
        Builtin::Clamp => component_wise("glsl.clamp"),
        Builtin::Mix => component_wise("glsl.mix"),
        Builtin::Step => component_wise("glsl.step"),
        Builtin::SmoothStep => component_wise("glsl.smoothstep"),
        Builtin::Length => both("Math.abs", VectorValue("length")),
        Builtin::Distance => both("glsl.distance", VectorValue("distance")),
        Builtin::Dot => both("glsl.mul", VectorValue("dot")),
        Builtin::Cross => Mapping {
            scalar: None,
            vector: Some(VectorOut("cross")),
            matrix: None,
        },
        Builtin::Normalize => both("Math.sign", VectorOut("normalize")),
        Builtin::FaceForward => both("glsl.faceforward", Function("glsl.faceforward")),
        Builtin::Reflect => both("glsl.reflect", Function("glsl.reflect")),
        Builtin::Refract => both("glsl.refract", Function("glsl.refract")),
        Builtin::MatrixCompMult => matrix_only(Map("glsl.mul")),
        Builtin::Transpose => matrix_only(MatrixOut("transpose")),
        Builtin::Inverse => matrix_only(MatrixOut("invert")),
        Builtin::Determinant => matrix_only(MatrixValue("determinant")),
    }
}
