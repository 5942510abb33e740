//! Standard value and shorthand managers.
//!
//! These cover the properties the engine's own tests exercise; embedders
//! with richer property sets bring their own managers.

use crate::property::{ComputeContext, ParseContext, ShorthandManager, ValueManager};
use css::{CssError, LexicalUnit, Rgba, Unit, Value};
use std::sync::Arc;

/// The default browser font size, used when no parent provides one.
const DEFAULT_FONT_SIZE: f32 = 16.0;

pub fn standard_value_managers() -> Vec<Arc<dyn ValueManager>> {
    vec![
        Arc::new(ColorManager::foreground()),
        Arc::new(IdentManager::new("display", false, "inline")),
        Arc::new(FontSizeManager::new()),
        Arc::new(LineHeightManager::new()),
        Arc::new(LengthManager::auto("width")),
        Arc::new(LengthManager::auto("height")),
        Arc::new(LengthManager::zero("margin-top")),
        Arc::new(LengthManager::zero("margin-right")),
        Arc::new(LengthManager::zero("margin-bottom")),
        Arc::new(LengthManager::zero("margin-left")),
        Arc::new(ColorManager::background()),
        Arc::new(OpacityManager::new()),
    ]
}

pub fn standard_shorthand_managers() -> Vec<Arc<dyn ShorthandManager>> {
    vec![Arc::new(MarginShorthand)]
}

fn single(units: &[LexicalUnit]) -> Result<&LexicalUnit, CssError> {
    match units {
        [u] => Ok(u),
        _ => Err(CssError::parse("expected a single component value")),
    }
}

fn is_inherit(units: &[LexicalUnit]) -> bool {
    matches!(units, [LexicalUnit::Ident(s)] if s.eq_ignore_ascii_case("inherit"))
}

fn channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn named_color(text: &str) -> Result<Rgba, CssError> {
    let color = csscolorparser::parse(text)
        .map_err(|e| CssError::parse(format!("invalid color {text:?}: {e}")))?;
    let [red, green, blue, alpha] = color.to_rgba8();
    Ok(Rgba {
        red,
        green,
        blue,
        alpha,
    })
}

fn rgb_function(name: &str, args: &[LexicalUnit]) -> Result<Rgba, CssError> {
    let mut channels: Vec<f32> = Vec::new();
    let mut alpha: Option<f32> = None;
    for unit in args.iter().filter(|u| !matches!(u, LexicalUnit::Comma)) {
        match unit {
            LexicalUnit::Number(n) => channels.push(*n),
            LexicalUnit::Percentage(p) => channels.push(p * 255.0 / 100.0),
            other => {
                return Err(CssError::parse(format!(
                    "unsupported {name}() component {other:?}"
                )))
            }
        }
    }
    if name.eq_ignore_ascii_case("rgba") || channels.len() == 4 {
        match channels.pop() {
            // The alpha channel is a 0..1 number, not a color channel.
            Some(a) => alpha = Some(a.clamp(0.0, 1.0)),
            None => return Err(CssError::parse("rgba() without components")),
        }
    }
    match channels.as_slice() {
        [r, g, b] => Ok(Rgba {
            red: channel(*r),
            green: channel(*g),
            blue: channel(*b),
            alpha: alpha.map_or(255, |a| channel(a * 255.0)),
        }),
        _ => Err(CssError::parse(format!("{name}() expects three channels"))),
    }
}

// Colors -----------------------------------------------------------------

pub struct ColorManager {
    name: &'static str,
    inherited: bool,
    default: Arc<Value>,
}

impl ColorManager {
    /// The `color` property: inherited, defaults to black.
    pub fn foreground() -> Self {
        Self {
            name: "color",
            inherited: true,
            default: Arc::new(Value::Color(Rgba {
                red: 0,
                green: 0,
                blue: 0,
                alpha: 255,
            })),
        }
    }

    /// The `background-color` property: not inherited, defaults to
    /// transparent, resolves `currentcolor` through the element's color.
    pub fn background() -> Self {
        Self {
            name: "background-color",
            inherited: false,
            default: Arc::new(Value::Color(Rgba {
                red: 0,
                green: 0,
                blue: 0,
                alpha: 0,
            })),
        }
    }
}

impl ValueManager for ColorManager {
    fn property_name(&self) -> &str {
        self.name
    }

    fn is_inherited_property(&self) -> bool {
        self.inherited
    }

    fn default_value(&self) -> Arc<Value> {
        self.default.clone()
    }

    fn create_value(
        &self,
        units: &[LexicalUnit],
        _ctx: &ParseContext<'_>,
    ) -> Result<Value, CssError> {
        if is_inherit(units) {
            return Ok(Value::Inherit);
        }
        match single(units)? {
            LexicalUnit::Ident(name) if name.eq_ignore_ascii_case("currentcolor") => {
                Ok(Value::Ident("currentcolor".to_string()))
            }
            LexicalUnit::Ident(name) if name.eq_ignore_ascii_case("transparent") => {
                Ok(Value::Color(Rgba {
                    red: 0,
                    green: 0,
                    blue: 0,
                    alpha: 0,
                }))
            }
            LexicalUnit::Ident(name) => Ok(Value::Color(named_color(name)?)),
            LexicalUnit::HexColor(hex) => Ok(Value::Color(named_color(&format!("#{hex}"))?)),
            LexicalUnit::Function { name, args }
                if name.eq_ignore_ascii_case("rgb") || name.eq_ignore_ascii_case("rgba") =>
            {
                Ok(Value::Color(rgb_function(name, args)?))
            }
            other => Err(CssError::parse(format!("invalid color value {other:?}"))),
        }
    }

    fn compute_value(
        &self,
        cx: &mut ComputeContext<'_, '_>,
        cascaded: &Arc<Value>,
    ) -> Result<Arc<Value>, CssError> {
        match &**cascaded {
            Value::Ident(s) if s == "currentcolor" => match cx.color_index() {
                Some(ci) if ci != cx.property_index() => Ok(cx.computed(ci)?.resolved()),
                _ => Ok(self.default.clone()),
            },
            Value::Inherit => Ok(self.default.clone()),
            _ => Ok(cascaded.clone()),
        }
    }
}

// Keyword properties ------------------------------------------------------

pub struct IdentManager {
    name: &'static str,
    inherited: bool,
    default: Arc<Value>,
}

impl IdentManager {
    pub fn new(name: &'static str, inherited: bool, default: &str) -> Self {
        Self {
            name,
            inherited,
            default: Arc::new(Value::Ident(default.to_string())),
        }
    }
}

impl ValueManager for IdentManager {
    fn property_name(&self) -> &str {
        self.name
    }

    fn is_inherited_property(&self) -> bool {
        self.inherited
    }

    fn default_value(&self) -> Arc<Value> {
        self.default.clone()
    }

    fn create_value(
        &self,
        units: &[LexicalUnit],
        _ctx: &ParseContext<'_>,
    ) -> Result<Value, CssError> {
        if is_inherit(units) {
            return Ok(Value::Inherit);
        }
        match single(units)? {
            LexicalUnit::Ident(s) => Ok(Value::Ident(s.to_ascii_lowercase())),
            other => Err(CssError::parse(format!(
                "{}: expected a keyword, got {other:?}",
                self.name
            ))),
        }
    }

    fn compute_value(
        &self,
        _cx: &mut ComputeContext<'_, '_>,
        cascaded: &Arc<Value>,
    ) -> Result<Arc<Value>, CssError> {
        match &**cascaded {
            Value::Inherit => Ok(self.default.clone()),
            _ => Ok(cascaded.clone()),
        }
    }
}

// font-size ---------------------------------------------------------------

pub struct FontSizeManager {
    default: Arc<Value>,
}

impl FontSizeManager {
    pub fn new() -> Self {
        Self {
            default: Arc::new(Value::px(DEFAULT_FONT_SIZE)),
        }
    }

    fn parent_px(cx: &mut ComputeContext<'_, '_>) -> Result<f32, CssError> {
        let parent = cx.parent_computed(cx.property_index())?;
        Ok(parent
            .and_then(|v| v.resolved().as_px())
            .unwrap_or(DEFAULT_FONT_SIZE))
    }
}

impl Default for FontSizeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueManager for FontSizeManager {
    fn property_name(&self) -> &str {
        "font-size"
    }

    fn is_inherited_property(&self) -> bool {
        true
    }

    fn default_value(&self) -> Arc<Value> {
        self.default.clone()
    }

    fn create_value(
        &self,
        units: &[LexicalUnit],
        _ctx: &ParseContext<'_>,
    ) -> Result<Value, CssError> {
        if is_inherit(units) {
            return Ok(Value::Inherit);
        }
        match single(units)? {
            LexicalUnit::Number(n) => Ok(Value::px(*n)),
            LexicalUnit::Dimension { value, unit } => Ok(Value::Length {
                value: *value,
                unit: Unit::from_name(unit),
            }),
            LexicalUnit::Percentage(p) => Ok(Value::Percentage(*p)),
            LexicalUnit::Ident(s) => Ok(Value::Ident(s.to_ascii_lowercase())),
            other => Err(CssError::parse(format!("invalid font-size {other:?}"))),
        }
    }

    fn compute_value(
        &self,
        cx: &mut ComputeContext<'_, '_>,
        cascaded: &Arc<Value>,
    ) -> Result<Arc<Value>, CssError> {
        match &**cascaded {
            Value::Length {
                unit: Unit::Px, ..
            } => Ok(cascaded.clone()),
            Value::Length {
                value,
                unit: Unit::Em,
            } => Ok(Arc::new(Value::px(value * Self::parent_px(cx)?))),
            Value::Percentage(p) => Ok(Arc::new(Value::px(Self::parent_px(cx)? * p / 100.0))),
            Value::Ident(s) => match s.as_str() {
                "larger" => Ok(Arc::new(Value::px(Self::parent_px(cx)? * 1.2))),
                "smaller" => Ok(Arc::new(Value::px(Self::parent_px(cx)? / 1.2))),
                _ => Ok(self.default.clone()),
            },
            Value::Inherit => Ok(self.default.clone()),
            _ => Ok(self.default.clone()),
        }
    }
}

// line-height -------------------------------------------------------------

pub struct LineHeightManager {
    default: Arc<Value>,
}

impl LineHeightManager {
    pub fn new() -> Self {
        Self {
            default: Arc::new(Value::Ident("normal".to_string())),
        }
    }

    /// The element's own computed font-size; consulting it is what makes
    /// the slot font-size-relative.
    fn own_font_size(cx: &mut ComputeContext<'_, '_>) -> Result<f32, CssError> {
        match cx.font_size_index() {
            Some(idx) => Ok(cx
                .computed(idx)?
                .resolved()
                .as_px()
                .unwrap_or(DEFAULT_FONT_SIZE)),
            None => Ok(DEFAULT_FONT_SIZE),
        }
    }
}

impl Default for LineHeightManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueManager for LineHeightManager {
    fn property_name(&self) -> &str {
        "line-height"
    }

    fn is_inherited_property(&self) -> bool {
        true
    }

    fn default_value(&self) -> Arc<Value> {
        self.default.clone()
    }

    fn create_value(
        &self,
        units: &[LexicalUnit],
        _ctx: &ParseContext<'_>,
    ) -> Result<Value, CssError> {
        if is_inherit(units) {
            return Ok(Value::Inherit);
        }
        match single(units)? {
            LexicalUnit::Number(n) => Ok(Value::Number(*n)),
            LexicalUnit::Dimension { value, unit } => Ok(Value::Length {
                value: *value,
                unit: Unit::from_name(unit),
            }),
            LexicalUnit::Percentage(p) => Ok(Value::Percentage(*p)),
            LexicalUnit::Ident(s) if s.eq_ignore_ascii_case("normal") => {
                Ok(Value::Ident("normal".to_string()))
            }
            other => Err(CssError::parse(format!("invalid line-height {other:?}"))),
        }
    }

    fn compute_value(
        &self,
        cx: &mut ComputeContext<'_, '_>,
        cascaded: &Arc<Value>,
    ) -> Result<Arc<Value>, CssError> {
        match &**cascaded {
            Value::Number(n) => Ok(Arc::new(Value::px(n * Self::own_font_size(cx)?))),
            Value::Length {
                value,
                unit: Unit::Em,
            } => Ok(Arc::new(Value::px(value * Self::own_font_size(cx)?))),
            Value::Percentage(p) => {
                Ok(Arc::new(Value::px(Self::own_font_size(cx)? * p / 100.0)))
            }
            Value::Ident(s) if s == "normal" => {
                Ok(Arc::new(Value::px(Self::own_font_size(cx)? * 1.2)))
            }
            Value::Length {
                unit: Unit::Px, ..
            } => Ok(cascaded.clone()),
            Value::Inherit => Ok(self.default.clone()),
            _ => Ok(self.default.clone()),
        }
    }
}

// Lengths -----------------------------------------------------------------

pub struct LengthManager {
    name: &'static str,
    default: Arc<Value>,
}

impl LengthManager {
    /// A length property defaulting to `auto`, e.g. `width`.
    pub fn auto(name: &'static str) -> Self {
        Self {
            name,
            default: Arc::new(Value::Ident("auto".to_string())),
        }
    }

    /// A length property defaulting to zero, e.g. the margins.
    pub fn zero(name: &'static str) -> Self {
        Self {
            name,
            default: Arc::new(Value::px(0.0)),
        }
    }
}

impl ValueManager for LengthManager {
    fn property_name(&self) -> &str {
        self.name
    }

    fn is_inherited_property(&self) -> bool {
        false
    }

    fn default_value(&self) -> Arc<Value> {
        self.default.clone()
    }

    fn create_value(
        &self,
        units: &[LexicalUnit],
        _ctx: &ParseContext<'_>,
    ) -> Result<Value, CssError> {
        if is_inherit(units) {
            return Ok(Value::Inherit);
        }
        match single(units)? {
            LexicalUnit::Number(n) => Ok(Value::px(*n)),
            LexicalUnit::Dimension { value, unit } => Ok(Value::Length {
                value: *value,
                unit: Unit::from_name(unit),
            }),
            LexicalUnit::Percentage(p) => Ok(Value::Percentage(*p)),
            LexicalUnit::Ident(s) if s.eq_ignore_ascii_case("auto") => {
                Ok(Value::Ident("auto".to_string()))
            }
            other => Err(CssError::parse(format!(
                "{}: invalid length {other:?}",
                self.name
            ))),
        }
    }

    fn compute_value(
        &self,
        cx: &mut ComputeContext<'_, '_>,
        cascaded: &Arc<Value>,
    ) -> Result<Arc<Value>, CssError> {
        match &**cascaded {
            Value::Length {
                value,
                unit: Unit::Em,
            } => {
                let fs = match cx.font_size_index() {
                    Some(idx) => cx
                        .computed(idx)?
                        .resolved()
                        .as_px()
                        .unwrap_or(DEFAULT_FONT_SIZE),
                    None => DEFAULT_FONT_SIZE,
                };
                Ok(Arc::new(Value::px(value * fs)))
            }
            Value::Inherit => Ok(self.default.clone()),
            _ => Ok(cascaded.clone()),
        }
    }
}

// opacity -----------------------------------------------------------------

pub struct OpacityManager {
    default: Arc<Value>,
}

impl OpacityManager {
    pub fn new() -> Self {
        Self {
            default: Arc::new(Value::Number(1.0)),
        }
    }
}

impl Default for OpacityManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueManager for OpacityManager {
    fn property_name(&self) -> &str {
        "opacity"
    }

    fn is_inherited_property(&self) -> bool {
        false
    }

    fn default_value(&self) -> Arc<Value> {
        self.default.clone()
    }

    fn create_value(
        &self,
        units: &[LexicalUnit],
        _ctx: &ParseContext<'_>,
    ) -> Result<Value, CssError> {
        if is_inherit(units) {
            return Ok(Value::Inherit);
        }
        match single(units)? {
            LexicalUnit::Number(n) => Ok(Value::Number(n.clamp(0.0, 1.0))),
            LexicalUnit::Percentage(p) => Ok(Value::Number((p / 100.0).clamp(0.0, 1.0))),
            other => Err(CssError::parse(format!("invalid opacity {other:?}"))),
        }
    }

    fn compute_value(
        &self,
        _cx: &mut ComputeContext<'_, '_>,
        cascaded: &Arc<Value>,
    ) -> Result<Arc<Value>, CssError> {
        match &**cascaded {
            Value::Inherit => Ok(self.default.clone()),
            _ => Ok(cascaded.clone()),
        }
    }
}

// margin shorthand --------------------------------------------------------

/// Expands `margin` into the four side longhands, with the usual
/// one-to-four value distribution.
pub struct MarginShorthand;

impl ShorthandManager for MarginShorthand {
    fn property_name(&self) -> &str {
        "margin"
    }

    fn set_values(
        &self,
        units: &[LexicalUnit],
        important: bool,
        _ctx: &ParseContext<'_>,
        emit: &mut dyn FnMut(&str, &[LexicalUnit], bool) -> Result<(), CssError>,
    ) -> Result<(), CssError> {
        if units.iter().any(|u| matches!(u, LexicalUnit::Comma)) {
            return Err(CssError::parse("margin does not take a comma list"));
        }
        let (t, r, b, l) = match units.len() {
            1 => (0, 0, 0, 0),
            2 => (0, 1, 0, 1),
            3 => (0, 1, 2, 1),
            4 => (0, 1, 2, 3),
            n => {
                return Err(CssError::parse(format!(
                    "margin expects 1 to 4 values, got {n}"
                )))
            }
        };
        for (name, i) in [
            ("margin-top", t),
            ("margin-right", r),
            ("margin-bottom", b),
            ("margin-left", l),
        ] {
            let value = [units[i].clone()];
            emit(name, &value, important)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcx() -> ParseContext<'static> {
        ParseContext { base_uri: None }
    }

    #[test]
    fn color_values_parse() {
        let m = ColorManager::foreground();
        let red = m
            .create_value(&[LexicalUnit::Ident("red".into())], &pcx())
            .unwrap();
        assert_eq!(
            red.as_color(),
            Some(Rgba {
                red: 255,
                green: 0,
                blue: 0,
                alpha: 255
            })
        );

        let hex = m
            .create_value(&[LexicalUnit::HexColor("00ff00".into())], &pcx())
            .unwrap();
        assert_eq!(
            hex.as_color(),
            Some(Rgba {
                red: 0,
                green: 255,
                blue: 0,
                alpha: 255
            })
        );

        let rgb = m
            .create_value(
                &[LexicalUnit::Function {
                    name: "rgb".into(),
                    args: vec![
                        LexicalUnit::Number(1.0),
                        LexicalUnit::Comma,
                        LexicalUnit::Number(2.0),
                        LexicalUnit::Comma,
                        LexicalUnit::Number(3.0),
                    ],
                }],
                &pcx(),
            )
            .unwrap();
        assert_eq!(
            rgb.as_color(),
            Some(Rgba {
                red: 1,
                green: 2,
                blue: 3,
                alpha: 255
            })
        );

        assert!(m
            .create_value(&[LexicalUnit::Ident("no-such-color".into())], &pcx())
            .is_err());
    }

    #[test]
    fn inherit_keyword_is_recognised() {
        let m = FontSizeManager::new();
        let v = m
            .create_value(&[LexicalUnit::Ident("inherit".into())], &pcx())
            .unwrap();
        assert!(v.is_inherit());
    }

    #[test]
    fn margin_shorthand_expands() {
        let m = MarginShorthand;
        let mut seen = Vec::new();
        m.set_values(
            &[
                LexicalUnit::Dimension {
                    value: 1.0,
                    unit: "px".into(),
                },
                LexicalUnit::Dimension {
                    value: 2.0,
                    unit: "px".into(),
                },
            ],
            true,
            &pcx(),
            &mut |name, units, important| {
                seen.push((name.to_string(), units.to_vec(), important));
                Ok(())
            },
        )
        .unwrap();
        let sides: Vec<&str> = seen.iter().map(|(n, _, _)| n.as_str()).collect();
        assert_eq!(
            sides,
            vec!["margin-top", "margin-right", "margin-bottom", "margin-left"]
        );
        // Two-value form alternates vertical and horizontal.
        assert_eq!(seen[0].1, seen[2].1);
        assert_eq!(seen[1].1, seen[3].1);
        assert!(seen.iter().all(|(_, _, imp)| *imp));
    }

    #[test]
    fn opacity_clamps() {
        let m = OpacityManager::new();
        let v = m
            .create_value(&[LexicalUnit::Number(1.5)], &pcx())
            .unwrap();
        assert_eq!(v.as_number(), Some(1.0));
        let v = m
            .create_value(&[LexicalUnit::Percentage(50.0)], &pcx())
            .unwrap();
        assert_eq!(v.as_number(), Some(0.5));
    }
}
