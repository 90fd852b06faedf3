//! Vertex layout descriptions handed over by mesh producers.

use std::collections::BTreeMap;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VertexAttributeName {
    Position,
    Texcoord0,
    Texcoord1,
    Normal,
    JointIndices,
    JointWeights,
}

impl VertexAttributeName {
    pub const ALL: [VertexAttributeName; 6] = [
        VertexAttributeName::Position,
        VertexAttributeName::Texcoord0,
        VertexAttributeName::Texcoord1,
        VertexAttributeName::Normal,
        VertexAttributeName::JointIndices,
        VertexAttributeName::JointWeights,
    ];

    /// Fixed attribute location this attribute is bound to when programs are linked.
    pub const fn location(self) -> u32 {
        self as u32
    }

    /// Name of the shader input this attribute feeds.
    pub const fn shader_input(self) -> &'static str {
        match self {
            VertexAttributeName::Position => "iPosition",
            VertexAttributeName::Texcoord0 => "iTexcoord0",
            VertexAttributeName::Texcoord1 => "iTexcoord1",
            VertexAttributeName::Normal => "iNormal",
            VertexAttributeName::JointIndices => "iJointIndices",
            VertexAttributeName::JointWeights => "iJointWeights",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ArithmeticType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float,
    Double,
}

impl ArithmeticType {
    pub const fn size_in_bytes(self) -> usize {
        match self {
            ArithmeticType::Int8 | ArithmeticType::UInt8 => 1,
            ArithmeticType::Int16 | ArithmeticType::UInt16 => 2,
            ArithmeticType::Int32 | ArithmeticType::UInt32 | ArithmeticType::Float => 4,
            ArithmeticType::Double => 8,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Number of components, 1 to 4.
    pub cardinality: u8,
    pub ty: ArithmeticType,
    pub normalized: bool,
    pub stride: u32,
    pub offset: u32,
}

impl VertexAttribute {
    pub const fn new(
        cardinality: u8,
        ty: ArithmeticType,
        normalized: bool,
        stride: u32,
        offset: u32,
    ) -> Self {
        Self {
            cardinality,
            ty,
            normalized,
            stride,
            offset,
        }
    }

    /// Tightly packed float attribute, e.g. `float(3)` for positions.
    pub const fn float(cardinality: u8) -> Self {
        Self::new(cardinality, ArithmeticType::Float, false, 0, 0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexFormat {
    pub attributes: BTreeMap<VertexAttributeName, VertexAttribute>,
    /// `Some` when the mesh is drawn with an index buffer of this type.
    pub index_type: Option<ArithmeticType>,
}

impl VertexFormat {
    pub fn new(
        attributes: impl IntoIterator<Item = (VertexAttributeName, VertexAttribute)>,
        index_type: Option<ArithmeticType>,
    ) -> Self {
        Self {
            attributes: attributes.into_iter().collect(),
            index_type,
        }
    }

    pub fn is_indexed(&self) -> bool {
        self.index_type.is_some()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    StaticDraw,
    DynamicDraw,
    StreamDraw,
}
