use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::RevalidationPolicy,
    types::{
        Field, FieldName, FieldValue, SettingsFieldsView, SettingsView, SubmissionState,
    },
    validator::{self, Siblings},
};

/// Settings as published by the authoritative source. Every key is optional:
/// an object without any key means no settings have been published yet.
/// Numbers are taken as published, so `70` and `70.0` both read as 70.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthoritativeSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<f64>,
}

impl AuthoritativeSettings {
    pub fn new(name: impl Into<String>, upper: i64, lower: i64, interval: i64) -> Self {
        Self {
            name: Some(name.into()),
            upper: Some(upper as f64),
            lower: Some(lower as f64),
            interval: Some(interval as f64),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.upper.is_none()
            && self.lower.is_none()
            && self.interval.is_none()
    }

    fn value_of(&self, field: FieldName) -> Option<FieldValue> {
        match field {
            FieldName::Name => self.name.clone().map(FieldValue::Text),
            FieldName::Upper => self.upper.map(FieldValue::Number),
            FieldName::Lower => self.lower.map(FieldValue::Number),
            FieldName::Interval => self.interval.map(FieldValue::Number),
        }
    }
}

/// Plain field values used to build the outbound payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsSnapshot {
    pub name: String,
    pub upper: i64,
    pub lower: i64,
    pub interval: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    pristine: bool,
    fields: [Field; 4],
    // False while a field holds its zeroed placeholder; such siblings are not revalidated.
    entered: [bool; 4],
    revalidation: RevalidationPolicy,
}

impl Default for FormState {
    fn default() -> Self {
        Self::new(RevalidationPolicy::default())
    }
}

impl FormState {
    pub fn new(revalidation: RevalidationPolicy) -> Self {
        Self {
            pristine: true,
            fields: FieldName::ALL.map(Field::placeholder),
            entered: [false; 4],
            revalidation,
        }
    }

    pub fn is_pristine(&self) -> bool {
        self.pristine
    }

    pub fn field(&self, field: FieldName) -> &Field {
        &self.fields[field.index()]
    }

    pub fn siblings(&self) -> Siblings {
        Siblings {
            upper: self.field(FieldName::Upper).value.as_number(),
            lower: self.field(FieldName::Lower).value.as_number(),
        }
    }

    /// Replaces the whole form with authoritative settings unless nothing was
    /// published yet or a submission is in flight or just failed. Returns
    /// whether the form was reset.
    pub fn initialize_from_authoritative(
        &mut self,
        settings: &AuthoritativeSettings,
        state: &SubmissionState,
    ) -> bool {
        if settings.is_empty() || state.is_submitting || state.is_erroneous {
            debug!(
                empty = settings.is_empty(),
                submitting = state.is_submitting,
                erroneous = state.is_erroneous,
                "authoritative settings not applied"
            );
            return false;
        }

        let mut next = Self::new(self.revalidation);
        for field in FieldName::ALL {
            if let Some(value) = settings.value_of(field) {
                next.fields[field.index()] = Field { value, valid: true };
                next.entered[field.index()] = true;
            }
        }
        *self = next;
        true
    }

    pub fn edit(&mut self, field: FieldName, raw: &str) {
        let (value, valid) = validator::validate(field, raw, &self.siblings());
        self.fields[field.index()] = Field { value, valid };
        self.entered[field.index()] = true;
        self.pristine = false;

        if self.revalidation == RevalidationPolicy::BothBounds {
            if let Some(sibling) = field.sibling() {
                self.revalidate(sibling);
            }
        }
    }

    pub fn is_submittable(&self) -> bool {
        !self.pristine && self.fields.iter().all(|field| field.valid)
    }

    /// Does not check validity; callers gate on `is_submittable` first.
    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            name: self.field(FieldName::Name).value.as_text().to_string(),
            upper: self.field(FieldName::Upper).value.as_number() as i64,
            lower: self.field(FieldName::Lower).value.as_number() as i64,
            interval: self.field(FieldName::Interval).value.as_number() as i64,
        }
    }

    pub fn save_label(state: &SubmissionState) -> &'static str {
        if state.is_submitting {
            "Saving…"
        } else {
            "Save"
        }
    }

    pub fn back_label(&self) -> &'static str {
        if self.pristine {
            "Go back"
        } else {
            "Cancel"
        }
    }

    pub fn view(&self, state: &SubmissionState) -> SettingsView {
        SettingsView {
            pristine: self.pristine,
            submittable: self.is_submittable(),
            loading: state.is_fetching,
            fields: SettingsFieldsView {
                name: self.field(FieldName::Name).clone(),
                upper: self.field(FieldName::Upper).clone(),
                lower: self.field(FieldName::Lower).clone(),
                interval: self.field(FieldName::Interval).clone(),
            },
            save_label: Self::save_label(state),
            save_enabled: self.is_submittable() && !state.is_submitting,
            back_label: self.back_label(),
        }
    }

    fn revalidate(&mut self, field: FieldName) {
        if !self.entered[field.index()] {
            return;
        }
        let siblings = self.siblings();
        let slot = &mut self.fields[field.index()];
        slot.valid = validator::is_valid(field, &slot.value, &siblings);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn idle() -> SubmissionState {
        SubmissionState::default()
    }

    fn rose() -> AuthoritativeSettings {
        AuthoritativeSettings::new("Rose", 70, 30, 1800)
    }

    #[test]
    fn starts_pristine_with_invalid_placeholders() {
        let form = FormState::default();

        assert!(form.is_pristine());
        assert!(!form.is_submittable());
        for field in FieldName::ALL {
            assert_eq!(form.field(field), &Field::placeholder(field));
        }
    }

    #[test]
    fn authoritative_settings_reset_form_as_pristine() {
        let mut form = FormState::default();
        form.edit(FieldName::Name, "draft");

        assert!(form.initialize_from_authoritative(&rose(), &idle()));

        assert!(form.is_pristine());
        assert_eq!(
            form.snapshot(),
            SettingsSnapshot {
                name: "Rose".to_string(),
                upper: 70,
                lower: 30,
                interval: 1800,
            }
        );
        for field in FieldName::ALL {
            assert!(form.field(field).valid, "{field} should be valid");
        }
        assert!(!form.is_submittable());
    }

    #[test]
    fn reset_is_skipped_while_submitting_or_erroneous() {
        let mut form = FormState::default();
        form.edit(FieldName::Name, "Fern");
        let dirty = form.clone();

        let submitting = SubmissionState {
            is_submitting: true,
            ..SubmissionState::default()
        };
        assert!(!form.initialize_from_authoritative(&rose(), &submitting));
        assert_eq!(form, dirty);

        let erroneous = SubmissionState {
            is_erroneous: true,
            ..SubmissionState::default()
        };
        assert!(!form.initialize_from_authoritative(&rose(), &erroneous));
        assert_eq!(form, dirty);
    }

    #[test]
    fn empty_settings_are_ignored() {
        let mut form = FormState::default();
        form.edit(FieldName::Upper, "60");
        let dirty = form.clone();

        assert!(!form.initialize_from_authoritative(&AuthoritativeSettings::default(), &idle()));
        assert_eq!(form, dirty);
    }

    #[test]
    fn partial_settings_mark_absent_fields_invalid() {
        let mut form = FormState::default();
        let partial = AuthoritativeSettings {
            name: Some("Basil".to_string()),
            upper: Some(80.0),
            ..AuthoritativeSettings::default()
        };

        assert!(form.initialize_from_authoritative(&partial, &idle()));

        assert!(form.is_pristine());
        assert!(form.field(FieldName::Name).valid);
        assert!(form.field(FieldName::Upper).valid);
        assert_eq!(form.field(FieldName::Lower), &Field::placeholder(FieldName::Lower));
        assert_eq!(
            form.field(FieldName::Interval),
            &Field::placeholder(FieldName::Interval)
        );

        form.edit(FieldName::Name, "Basil");
        assert!(!form.is_submittable());
    }

    #[test]
    fn float_encoded_numbers_are_accepted() {
        let settings: AuthoritativeSettings = serde_json::from_str(
            r#"{"name":"Rose","upper":70.0,"lower":30,"interval":1800.0}"#,
        )
        .unwrap();
        assert_eq!(settings, rose());

        let mut form = FormState::default();
        assert!(form.initialize_from_authoritative(&settings, &idle()));
        assert_eq!(form.snapshot().upper, 70);
        assert_eq!(form.snapshot().interval, 1800);
    }

    #[test]
    fn any_edit_clears_pristine() {
        let mut form = FormState::default();
        form.initialize_from_authoritative(&rose(), &idle());

        form.edit(FieldName::Interval, "1800");

        assert!(!form.is_pristine());
        assert!(form.is_submittable());
        assert_eq!(form.back_label(), "Cancel");
    }

    #[test]
    fn pristine_form_is_never_submittable() {
        let mut form = FormState::default();
        form.initialize_from_authoritative(&rose(), &idle());

        assert!(FieldName::ALL.iter().all(|field| form.field(*field).valid));
        assert!(!form.is_submittable());
        assert_eq!(form.back_label(), "Go back");
    }

    #[test]
    fn both_bounds_policy_revalidates_sibling() {
        let mut form = FormState::new(RevalidationPolicy::BothBounds);
        form.initialize_from_authoritative(&rose(), &idle());

        form.edit(FieldName::Lower, "80");
        assert!(!form.field(FieldName::Lower).valid);
        assert!(!form.field(FieldName::Upper).valid);

        form.edit(FieldName::Upper, "90");
        assert!(form.field(FieldName::Upper).valid);
        assert!(form.field(FieldName::Lower).valid);
    }

    #[test]
    fn edited_field_only_policy_keeps_stale_sibling_verdict() {
        let mut form = FormState::new(RevalidationPolicy::EditedFieldOnly);
        form.initialize_from_authoritative(&rose(), &idle());

        form.edit(FieldName::Lower, "80");
        assert!(!form.field(FieldName::Lower).valid);
        assert!(form.field(FieldName::Upper).valid);

        form.edit(FieldName::Upper, "90");
        assert!(form.field(FieldName::Upper).valid);
        assert!(!form.field(FieldName::Lower).valid);
    }

    #[test]
    fn bounds_are_valid_in_either_edit_order() {
        for (upper, lower) in [(1_i32, 0_i32), (60, 40), (100, 99), (51, 50)] {
            let mut upper_first = FormState::new(RevalidationPolicy::BothBounds);
            upper_first.edit(FieldName::Upper, &upper.to_string());
            upper_first.edit(FieldName::Lower, &lower.to_string());

            let mut lower_first = FormState::new(RevalidationPolicy::BothBounds);
            lower_first.edit(FieldName::Lower, &lower.to_string());
            lower_first.edit(FieldName::Upper, &upper.to_string());

            for form in [&upper_first, &lower_first] {
                assert!(form.field(FieldName::Upper).valid, "{upper}/{lower}");
                assert!(form.field(FieldName::Lower).valid, "{upper}/{lower}");
            }
        }
    }

    #[test]
    fn inverted_bounds_leave_at_least_one_invalid() {
        for policy in [
            RevalidationPolicy::BothBounds,
            RevalidationPolicy::EditedFieldOnly,
        ] {
            for (upper, lower) in [(40_i32, 60_i32), (50, 50), (1, 99)] {
                let mut form = FormState::new(policy);
                form.edit(FieldName::Upper, &upper.to_string());
                form.edit(FieldName::Lower, &lower.to_string());

                let upper_ok = form.field(FieldName::Upper).valid;
                let lower_ok = form.field(FieldName::Lower).valid;
                assert!(!(upper_ok && lower_ok), "{policy:?} {upper}/{lower}");
            }
        }
    }

    #[test]
    fn untouched_placeholder_is_not_revalidated() {
        let mut form = FormState::new(RevalidationPolicy::BothBounds);

        form.edit(FieldName::Upper, "60");

        assert!(form.field(FieldName::Upper).valid);
        assert!(!form.field(FieldName::Lower).valid);
    }

    #[test]
    fn editing_unrelated_field_does_not_touch_bounds() {
        let mut form = FormState::new(RevalidationPolicy::BothBounds);
        form.edit(FieldName::Lower, "70");
        form.edit(FieldName::Interval, "60");

        assert!(!form.field(FieldName::Lower).valid);
    }

    #[test]
    fn view_reflects_submission_flags() {
        let mut form = FormState::default();
        form.initialize_from_authoritative(&rose(), &idle());
        form.edit(FieldName::Name, "Rosa");

        let view = form.view(&idle());
        assert!(view.save_enabled);
        assert_eq!(view.save_label, "Save");
        assert!(!view.fields.name.is_invalid());

        let submitting = SubmissionState {
            is_submitting: true,
            ..SubmissionState::default()
        };
        let view = form.view(&submitting);
        assert!(!view.save_enabled);
        assert_eq!(view.save_label, "Saving…");

        let fetching = SubmissionState {
            is_fetching: true,
            ..SubmissionState::default()
        };
        assert!(form.view(&fetching).loading);
    }
}
