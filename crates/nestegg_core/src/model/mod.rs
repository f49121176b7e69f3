mod accounts;
mod market;
mod profile;
mod results;
mod rmd;
mod tax_config;

pub use accounts::{AccountBalances, AccountBucket, Balances};
pub use market::{
    ALLOCATION_TOLERANCE, AssetAllocation, AssetClassParams, MarketAssumptions, MarketPeriod,
    MarketPeriods, MarketPreset, MarketSelection, PeriodSchedule,
};
pub use profile::{
    AnnualSavings, DEFAULT_CLAIMING_AGE, DEFAULT_LIFE_EXPECTANCY, FilingStatus, HouseholdProfile,
    Pension, PensionStart, Person, RothConversion, SocialSecurity, SpendingModel,
};
pub use results::{
    PathPhase, PercentileSeries, RepresentativePath, SimulationResult, SimulationWarning,
    SummaryStats, WarningKind, WarningTally, YearRecord,
};
pub use rmd::{DEFAULT_RMD_START_AGE, RmdTable, RmdTableEntry};
pub use tax_config::{
    FilingTable, IrmaaTier, SocialSecurityThresholds, StateTax, TaxBracket, TaxConfig,
};
