// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Style model
//!
//! A [`StyleDefinition`] is what one KML `<Style>` element says about the
//! icon, label, line and polygon of whatever uses it. Every field is
//! optional: `None` means the style does not specify it, which is different
//! from specifying a default. Definitions combine through the
//! [`FillIfAbsent`] contract, where a field that is already set is never
//! overwritten.

use nom::{
    bytes::complete::take_while_m_n,
    character::complete::char,
    combinator::{all_consuming, map_res, opt},
    sequence::{preceded, tuple},
    IResult,
};

use crate::coordinates::parse_float;
use crate::tree::Node;

/// Fill-if-absent merge
///
/// `target.fill_from(&source)` keeps every field already set on `target` and
/// takes the remaining ones from `source`. Applying the same source twice
/// gives the same result as applying it once.
pub trait FillIfAbsent {
    #[must_use]
    fn fill_from(self, source: &Self) -> Self;
}

/// Fill a single optional field
#[inline]
fn fill<T: Clone>(target: Option<T>, source: &Option<T>) -> Option<T> {
    target.or_else(|| source.clone())
}

/// Fill an optional sub-style bag, merging field by field when both are set
pub fn fill_bag<T: FillIfAbsent + Clone>(target: Option<T>, source: &Option<T>) -> Option<T> {
    match (target, source) {
        (Some(target), Some(source)) => Some(target.fill_from(source)),
        (None, source) => source.clone(),
        (target, None) => target,
    }
}

/// RGBA color, components in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Parse KML `aabbggrr` hex text (a leading `#` is tolerated)
    pub fn from_kml_hex(text: &str) -> Option<Color> {
        let (_, (alpha, blue, green, red)) = kml_color(text.trim()).ok()?;
        Some(Color::new(
            red as f32 / 255.0,
            green as f32 / 255.0,
            blue as f32 / 255.0,
            alpha as f32 / 255.0,
        ))
    }
}

fn hex_byte(input: &str) -> IResult<&str, u8> {
    map_res(take_while_m_n(2, 2, |c: char| c.is_ascii_hexdigit()), |s: &str| {
        u8::from_str_radix(s, 16)
    })(input)
}

/// `[#]aabbggrr`
fn kml_color(input: &str) -> IResult<&str, (u8, u8, u8, u8)> {
    all_consuming(preceded(
        opt(char('#')),
        tuple((hex_byte, hex_byte, hex_byte, hex_byte)),
    ))(input)
}

/// KML `colorMode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ColorMode {
    #[default]
    Normal,
    /// Each channel is scaled by a random factor when rendered
    Random,
}

impl ColorMode {
    fn from_kml(text: &str) -> Option<Self> {
        match text {
            "normal" => Some(ColorMode::Normal),
            "random" => Some(ColorMode::Random),
            _ => None,
        }
    }
}

/// `IconStyle`, routed to an entity's billboard
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct IconStyle {
    pub image: Option<String>,
    pub scale: Option<f64>,
    pub color: Option<Color>,
    pub color_mode: Option<ColorMode>,
}

impl FillIfAbsent for IconStyle {
    fn fill_from(self, source: &Self) -> Self {
        Self {
            image: fill(self.image, &source.image),
            scale: fill(self.scale, &source.scale),
            color: fill(self.color, &source.color),
            color_mode: fill(self.color_mode, &source.color_mode),
        }
    }
}

/// `LabelStyle`, routed to an entity's label
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LabelStyle {
    pub scale: Option<f64>,
    pub fill_color: Option<Color>,
    pub color_mode: Option<ColorMode>,
    /// Label text; KML styles never carry it, it comes from the placemark name
    pub text: Option<String>,
}

impl FillIfAbsent for LabelStyle {
    fn fill_from(self, source: &Self) -> Self {
        Self {
            scale: fill(self.scale, &source.scale),
            fill_color: fill(self.fill_color, &source.fill_color),
            color_mode: fill(self.color_mode, &source.color_mode),
            text: fill(self.text, &source.text),
        }
    }
}

/// `LineStyle`, routed to an entity's polyline
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LineStyle {
    pub color: Option<Color>,
    pub width: Option<f64>,
    pub outline_color: Option<Color>,
    pub outline_width: Option<f64>,
    pub color_mode: Option<ColorMode>,
}

impl FillIfAbsent for LineStyle {
    fn fill_from(self, source: &Self) -> Self {
        Self {
            color: fill(self.color, &source.color),
            width: fill(self.width, &source.width),
            outline_color: fill(self.outline_color, &source.outline_color),
            outline_width: fill(self.outline_width, &source.outline_width),
            color_mode: fill(self.color_mode, &source.color_mode),
        }
    }
}

/// `PolyStyle`, routed to an entity's polygon
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PolygonStyle {
    pub color: Option<Color>,
    pub fill: Option<bool>,
    pub outline: Option<bool>,
    pub color_mode: Option<ColorMode>,
}

impl FillIfAbsent for PolygonStyle {
    fn fill_from(self, source: &Self) -> Self {
        Self {
            color: fill(self.color, &source.color),
            fill: fill(self.fill, &source.fill),
            outline: fill(self.outline, &source.outline),
            color_mode: fill(self.color_mode, &source.color_mode),
        }
    }
}

/// Everything one `<Style>` element specifies
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StyleDefinition {
    pub icon: Option<IconStyle>,
    pub label: Option<LabelStyle>,
    pub line: Option<LineStyle>,
    pub polygon: Option<PolygonStyle>,
}

impl StyleDefinition {
    /// True when no sub-style is present
    pub fn is_empty(&self) -> bool {
        self.icon.is_none() && self.label.is_none() && self.line.is_none() && self.polygon.is_none()
    }

    /// Read the sub-styles of a `<Style>` element
    ///
    /// When a sub-style element is repeated the later one replaces the
    /// earlier.
    pub fn from_node(style: &Node) -> Self {
        let mut definition = StyleDefinition::default();

        for node in style.children() {
            match node.tag() {
                "IconStyle" => {
                    definition.icon = Some(IconStyle {
                        image: node.descendant_text("href"),
                        scale: number(node, "scale"),
                        color: color(node, "color"),
                        color_mode: color_mode(node),
                    });
                }
                "LabelStyle" => {
                    definition.label = Some(LabelStyle {
                        scale: number(node, "scale"),
                        fill_color: color(node, "color"),
                        color_mode: color_mode(node),
                        text: None,
                    });
                }
                "LineStyle" => {
                    // KML 2.2 spells the outline fields gx:outerColor/gx:outerWidth
                    definition.line = Some(LineStyle {
                        color: color(node, "color"),
                        width: number(node, "width"),
                        outline_color: color(node, "outerColor"),
                        outline_width: number(node, "outerWidth"),
                        color_mode: color_mode(node),
                    });
                }
                "PolyStyle" => {
                    definition.polygon = Some(PolygonStyle {
                        color: color(node, "color"),
                        fill: boolean(node, "fill"),
                        outline: boolean(node, "outline"),
                        color_mode: color_mode(node),
                    });
                }
                _ => {}
            }
        }

        definition
    }
}

impl FillIfAbsent for StyleDefinition {
    fn fill_from(self, source: &Self) -> Self {
        Self {
            icon: fill_bag(self.icon, &source.icon),
            label: fill_bag(self.label, &source.label),
            line: fill_bag(self.line, &source.line),
            polygon: fill_bag(self.polygon, &source.polygon),
        }
    }
}

fn number(node: &Node, tag: &str) -> Option<f64> {
    node.descendant_text(tag).as_deref().and_then(parse_float)
}

fn color(node: &Node, tag: &str) -> Option<Color> {
    let text = node.descendant_text(tag)?;
    let parsed = Color::from_kml_hex(&text);
    if parsed.is_none() {
        tracing::warn!(tag, value = %text, "Ignoring malformed KML color");
    }
    parsed
}

fn color_mode(node: &Node) -> Option<ColorMode> {
    node.descendant_text("colorMode")
        .as_deref()
        .and_then(ColorMode::from_kml)
}

fn boolean(node: &Node, tag: &str) -> Option<bool> {
    match node.descendant_text(tag)?.as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}
