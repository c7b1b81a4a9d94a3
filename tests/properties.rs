mod common;

use proptest::prelude::*;
use sheet_validate::{
    DynamicRecord, GridSource, NoConstraints, ValidationOptions,
    coerce::INTEGER_FORMAT_HINT, validate,
};

use common::{people_columns, people_schema};

fn grid(ages: &[String]) -> GridSource {
    let mut rows = vec![vec!["Name".to_string(), "Age".to_string()]];
    rows.extend(
        ages.iter()
            .enumerate()
            .map(|(idx, age)| vec![format!("person{idx}"), age.clone()]),
    );
    GridSource::new(rows)
}

proptest! {
    #[test]
    fn integer_ages_always_bind(ages in proptest::collection::vec(any::<i64>(), 1..20)) {
        let raw = ages.iter().map(i64::to_string).collect::<Vec<_>>();
        let result = validate::<DynamicRecord, _>(
            &mut grid(&raw),
            &people_columns(),
            &people_schema(),
            &NoConstraints,
            &ValidationOptions::new(),
        ).expect("run");
        prop_assert!(result.is_valid);
        let records = result.data.expect("records");
        prop_assert_eq!(records.len(), ages.len());
        for (record, age) in records.iter().zip(&ages) {
            prop_assert_eq!(record["age"].as_i64(), Some(*age));
        }
    }

    #[test]
    fn alphabetic_ages_fail_once_per_row(
        ages in proptest::collection::vec("[a-zA-Z]{1,6}", 1..10),
        start in 1usize..5,
    ) {
        let mut rows = vec![vec!["Name".to_string(), "Age".to_string()]];
        rows.extend(std::iter::repeat_n(vec!["pad".to_string(), "0".to_string()], start - 1));
        rows.extend(ages.iter().map(|age| vec!["x".to_string(), age.clone()]));
        let options = ValidationOptions::new().start_row(start);
        let result = validate::<DynamicRecord, _>(
            &mut GridSource::new(rows),
            &people_columns(),
            &people_schema(),
            &NoConstraints,
            &options,
        ).expect("run");
        prop_assert!(!result.is_valid);
        prop_assert!(result.data.is_none());
        prop_assert_eq!(result.violations.len(), ages.len());
        for (offset, violation) in result.violations.iter().enumerate() {
            let label = format!("Row {} ", start + 1 + offset);
            prop_assert!(violation.message.starts_with(&label));
            prop_assert!(violation.message.contains(INTEGER_FORMAT_HINT));
        }
    }
}
