// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Style Cascade Engine
//!
//! Precedence for one placemark, highest first:
//!
//! 1. the last inline `<Style>` child (earlier inline styles are ignored)
//! 2. the style named by the first `<styleUrl>` child, local or external
//!
//! The combined definition is then routed to the property bags that make
//! sense for the placemark's geometry and merged under whatever the entity
//! already carries.

use url::Url;

use crate::entity::Entity;
use crate::error::Result;
use crate::geometry::GeometryKind;
use crate::registry::{StyleKey, StyleRegistry};
use crate::style::{fill_bag, FillIfAbsent, StyleDefinition};
use crate::tree::Node;

/// Combine the inline style and the shared style of `node`
pub fn resolve_inline_and_shared(
    node: &Node,
    registry: &StyleRegistry,
    base: Option<&Url>,
) -> Result<StyleDefinition> {
    let inline = node
        .children()
        .iter()
        .rev()
        .find(|child| child.tag() == "Style")
        .map(StyleDefinition::from_node)
        .unwrap_or_default();

    let style_url = match node.child("styleUrl") {
        Some(style_url) => style_url.text(),
        None => return Ok(inline),
    };

    let key = StyleKey::from_style_url(&style_url, base)?;
    match registry.lookup(&key) {
        Some(shared) => Ok(inline.fill_from(shared)),
        None => {
            tracing::debug!(style = %key, "Style reference not found in registry");
            Ok(inline)
        }
    }
}

/// Merge the sub-styles relevant to `kind` into the entity
///
/// Fields already set on the entity are kept.
pub fn apply_to_entity(entity: &mut Entity, style: &StyleDefinition, kind: GeometryKind) {
    match kind {
        GeometryKind::Point => {
            entity.billboard = fill_bag(entity.billboard.take(), &style.icon);
            entity.label = fill_bag(entity.label.take(), &style.label);
        }
        GeometryKind::LineString => {
            entity.polyline = fill_bag(entity.polyline.take(), &style.line);
        }
        GeometryKind::Polygon => {
            entity.polygon = fill_bag(entity.polygon.take(), &style.polygon);
        }
        // Rings carry no style
        GeometryKind::LinearRing => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{Color, IconStyle, LineStyle};

    fn registry_for(doc: &Node) -> StyleRegistry {
        let mut registry = StyleRegistry::new();
        registry.register_local_styles(doc, None);
        registry
    }

    #[test]
    fn test_last_inline_style_wins() {
        let doc = Node::parse(
            r#"<Placemark>
                 <Style><LineStyle><width>1</width><color>ff0000ff</color></LineStyle></Style>
                 <Style><LineStyle><width>7</width></LineStyle></Style>
               </Placemark>"#,
        )
        .unwrap();

        let style = resolve_inline_and_shared(&doc, &StyleRegistry::new(), None).unwrap();
        let line = style.line.unwrap();
        assert_eq!(line.width, Some(7.0));
        // Fields of the discarded style do not leak through
        assert_eq!(line.color, None);
    }

    #[test]
    fn test_inline_beats_shared() {
        let doc = Node::parse(
            r#"<kml><Document>
                 <Style id="shared"><LineStyle><width>9</width><color>ff00ff00</color></LineStyle></Style>
                 <Placemark>
                   <styleUrl>#shared</styleUrl>
                   <Style><LineStyle><width>2</width></LineStyle></Style>
                 </Placemark>
               </Document></kml>"#,
        )
        .unwrap();
        let registry = registry_for(&doc);
        let placemark = doc.first_descendant("Placemark").unwrap();

        let style = resolve_inline_and_shared(placemark, &registry, None).unwrap();
        let line = style.line.unwrap();
        assert_eq!(line.width, Some(2.0));
        assert_eq!(line.color, Some(Color::new(0.0, 1.0, 0.0, 1.0)));
    }

    #[test]
    fn test_only_first_style_url_used() {
        let doc = Node::parse(
            r#"<kml><Document>
                 <Style id="a"><IconStyle><scale>1</scale></IconStyle></Style>
                 <Style id="b"><IconStyle><scale>2</scale><Icon><href>b.png</href></Icon></IconStyle></Style>
                 <Placemark><styleUrl>#a</styleUrl><styleUrl>#b</styleUrl></Placemark>
               </Document></kml>"#,
        )
        .unwrap();
        let registry = registry_for(&doc);
        let placemark = doc.first_descendant("Placemark").unwrap();

        let icon = resolve_inline_and_shared(placemark, &registry, None)
            .unwrap()
            .icon
            .unwrap();
        assert_eq!(icon.scale, Some(1.0));
        assert_eq!(icon.image, None);
    }

    #[test]
    fn test_unknown_reference_keeps_inline() {
        let doc = Node::parse(
            "<Placemark><styleUrl>#missing</styleUrl><Style><PolyStyle><fill>1</fill></PolyStyle></Style></Placemark>",
        )
        .unwrap();
        let style = resolve_inline_and_shared(&doc, &StyleRegistry::new(), None).unwrap();
        assert_eq!(style.polygon.unwrap().fill, Some(true));
    }

    #[test]
    fn test_routing_by_kind() {
        let style = StyleDefinition {
            icon: Some(IconStyle {
                scale: Some(2.0),
                ..Default::default()
            }),
            line: Some(LineStyle {
                width: Some(3.0),
                ..Default::default()
            }),
            ..Default::default()
        };

        let mut point = Entity::new("p");
        apply_to_entity(&mut point, &style, GeometryKind::Point);
        assert!(point.billboard.is_some());
        assert!(point.polyline.is_none());

        let mut line = Entity::new("l");
        apply_to_entity(&mut line, &style, GeometryKind::LineString);
        assert!(line.billboard.is_none());
        assert_eq!(line.polyline.as_ref().unwrap().width, Some(3.0));

        let mut ring = Entity::new("r");
        apply_to_entity(&mut ring, &style, GeometryKind::LinearRing);
        assert_eq!(ring, Entity::new("r"));
    }

    #[test]
    fn test_apply_preserves_entity_fields() {
        let mut entity = Entity::new("e");
        entity.polyline = Some(LineStyle {
            width: Some(1.0),
            ..Default::default()
        });
        let style = StyleDefinition {
            line: Some(LineStyle {
                width: Some(5.0),
                color: Some(Color::WHITE),
                ..Default::default()
            }),
            ..Default::default()
        };

        apply_to_entity(&mut entity, &style, GeometryKind::LineString);
        apply_to_entity(&mut entity, &style, GeometryKind::LineString);
        let line = entity.polyline.unwrap();
        assert_eq!(line.width, Some(1.0));
        assert_eq!(line.color, Some(Color::WHITE));
    }
}
