use tracing::warn;

use crate::models::{Event, EventDraft};
use crate::timestamps::TimestampCodec;

/// Editable fields of the popup form, by their UI names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Provider,
    Summary,
    PriceAmount,
    ActiveTimeRangeLower,
    ActiveTimeRangeUpper,
    Description,
    Id,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Title,
        Field::Provider,
        Field::Summary,
        Field::PriceAmount,
        Field::ActiveTimeRangeLower,
        Field::ActiveTimeRangeUpper,
        Field::Description,
        Field::Id,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Provider => "provider",
            Field::Summary => "summary",
            Field::PriceAmount => "priceAmount",
            Field::ActiveTimeRangeLower => "activeTimeRangeLower",
            Field::ActiveTimeRangeUpper => "activeTimeRangeUpper",
            Field::Description => "description",
            Field::Id => "id",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }
}

/// Raw field values exactly as the user sees them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub title: String,
    pub provider: String,
    pub summary: String,
    pub price_amount: String,
    pub active_time_range_lower: String,
    pub active_time_range_upper: String,
    pub description: String,
    pub id: String,
}

impl FormState {
    pub fn render(event: &Event, codec: &TimestampCodec) -> Self {
        Self {
            title: event.title.clone(),
            provider: event.provider.clone(),
            summary: event.summary.clone(),
            price_amount: format_price(event.price_amount),
            active_time_range_lower: event
                .active_time_range_lower
                .map(|instant| codec.format_local(instant))
                .unwrap_or_default(),
            active_time_range_upper: event
                .active_time_range_upper
                .map(|instant| codec.format_local(instant))
                .unwrap_or_default(),
            description: event.description.clone(),
            id: event.id.clone().unwrap_or_default(),
        }
    }

    pub fn collect(&self, codec: &TimestampCodec) -> EventDraft {
        let price_amount = parse_price(&self.price_amount);
        if price_amount.is_nan() {
            warn!(input = %self.price_amount, "price is not a number");
        }
        let id = self.id.trim();
        EventDraft {
            id: (!id.is_empty()).then(|| id.to_string()),
            title: self.title.clone(),
            provider: self.provider.clone(),
            summary: self.summary.clone(),
            description: self.description.clone(),
            price_amount,
            active_time_range_lower: codec.parse_local(&self.active_time_range_lower),
            active_time_range_upper: codec.parse_local(&self.active_time_range_upper),
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Title => &self.title,
            Field::Provider => &self.provider,
            Field::Summary => &self.summary,
            Field::PriceAmount => &self.price_amount,
            Field::ActiveTimeRangeLower => &self.active_time_range_lower,
            Field::ActiveTimeRangeUpper => &self.active_time_range_upper,
            Field::Description => &self.description,
            Field::Id => &self.id,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Provider => &mut self.provider,
            Field::Summary => &mut self.summary,
            Field::PriceAmount => &mut self.price_amount,
            Field::ActiveTimeRangeLower => &mut self.active_time_range_lower,
            Field::ActiveTimeRangeUpper => &mut self.active_time_range_upper,
            Field::Description => &mut self.description,
            Field::Id => &mut self.id,
        };
        *slot = value.into();
    }
}

// Zero renders blank, same as an absent price.
fn format_price(price: Option<f64>) -> String {
    match price {
        Some(value) if value != 0.0 && !value.is_nan() => value.to_string(),
        _ => String::new(),
    }
}

// Blank input counts as zero; anything unparseable or non-finite is NaN.
fn parse_price(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(f64::NAN)
}

/// Which main region of the popup is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Idle,
    Loading,
    Form,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Advisory,
    Error,
    Success,
}

impl BannerKind {
    /// Background and text colours.
    pub fn palette(self) -> (&'static str, &'static str) {
        match self {
            BannerKind::Advisory => ("#fff3e0", "#e65100"),
            BannerKind::Error => ("#ffebee", "#c62828"),
            BannerKind::Success => ("#e8f5e9", "#2e7d32"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub text: String,
}

/// Owns the on-screen draft plus the loading/banner/form regions.
/// The banner overlays whichever region is showing.
#[derive(Debug, Clone)]
pub struct FormController {
    fields: FormState,
    region: Region,
    banner: Option<Banner>,
    codec: TimestampCodec,
}

impl FormController {
    pub fn new(codec: TimestampCodec) -> Self {
        Self {
            fields: FormState::default(),
            region: Region::Idle,
            banner: None,
            codec,
        }
    }

    pub fn fields(&self) -> &FormState {
        &self.fields
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn render(&mut self, event: &Event) {
        self.fields = FormState::render(event, &self.codec);
    }

    pub fn collect(&self) -> EventDraft {
        self.fields.collect(&self.codec)
    }

    pub fn reset(&mut self) {
        self.fields = FormState::default();
    }

    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        self.fields.set(field, value);
    }

    pub fn show_loading(&mut self) {
        self.region = Region::Loading;
        self.banner = None;
    }

    pub fn show_form(&mut self) {
        self.region = Region::Form;
    }

    pub fn show_banner(&mut self, kind: BannerKind, text: impl Into<String>) {
        self.banner = Some(Banner {
            kind,
            text: text.into(),
        });
    }
}
