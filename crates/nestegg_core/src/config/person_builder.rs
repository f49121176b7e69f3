//! Person Builder DSL
//!
//! # Examples
//!
//! ```ignore
//! use nestegg_core::config::PersonBuilder;
//!
//! let alex = PersonBuilder::new("Alex")
//!     .born(1965, 3, 14)
//!     .retires(2030, 1, 1)
//!     .salary(120_000.0)
//!     .deferral(0.10)
//!     .employer_match(0.04)
//!     .social_security(2_800.0, 67)
//!     .build();
//! ```

use jiff::civil::{Date, date};

use crate::model::{Pension, PensionStart, Person, SocialSecurity};

/// Builder for one member of the household
#[derive(Debug, Clone)]
pub struct PersonBuilder {
    person: Person,
}

impl PersonBuilder {
    /// Start with a person born 1960-01-01 who retires at 65
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            person: Person::new(name, date(1960, 1, 1), date(2025, 1, 1)),
        }
    }

    #[must_use]
    pub fn birth_date(mut self, birth_date: Date) -> Self {
        self.person.birth_date = birth_date;
        self
    }

    /// Set the birth date (convenience method)
    #[must_use]
    pub fn born(self, year: i16, month: i8, day: i8) -> Self {
        self.birth_date(date(year, month, day))
    }

    #[must_use]
    pub fn retirement_date(mut self, retirement_date: Date) -> Self {
        self.person.retirement_date = retirement_date;
        self
    }

    /// Set the retirement date (convenience method)
    #[must_use]
    pub fn retires(self, year: i16, month: i8, day: i8) -> Self {
        self.retirement_date(date(year, month, day))
    }

    #[must_use]
    pub fn life_expectancy(mut self, age: u8) -> Self {
        self.person.life_expectancy = age;
        self
    }

    #[must_use]
    pub fn salary(mut self, annual: f64) -> Self {
        self.person.salary = annual;
        self
    }

    /// Employee 401(k) deferral as a fraction of salary
    #[must_use]
    pub fn deferral(mut self, rate: f64) -> Self {
        self.person.deferral_rate = rate;
        self
    }

    #[must_use]
    pub fn employer_match(mut self, rate: f64) -> Self {
        self.person.employer_match_rate = rate;
        self
    }

    /// Monthly benefit in today's dollars, claimed at `claiming_age`
    #[must_use]
    pub fn social_security(mut self, monthly_benefit: f64, claiming_age: u8) -> Self {
        self.person.social_security = Some(SocialSecurity {
            monthly_benefit,
            claiming_age,
        });
        self
    }

    /// Pension starting at retirement
    #[must_use]
    pub fn pension(mut self, annual_amount: f64, cost_of_living_adjustment: bool) -> Self {
        self.person.pension = Some(Pension {
            annual_amount,
            start: PensionStart::AtRetirement,
            cost_of_living_adjustment,
        });
        self
    }

    /// Pension starting at `age` (but not before retirement)
    #[must_use]
    pub fn pension_at_age(
        mut self,
        annual_amount: f64,
        age: u8,
        cost_of_living_adjustment: bool,
    ) -> Self {
        self.person.pension = Some(Pension {
            annual_amount,
            start: PensionStart::AtAge(age),
            cost_of_living_adjustment,
        });
        self
    }

    #[must_use]
    pub fn build(self) -> Person {
        self.person
    }
}

impl From<PersonBuilder> for Person {
    fn from(builder: PersonBuilder) -> Self {
        builder.build()
    }
}
