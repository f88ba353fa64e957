/// 碳權價格更新
pub mod carbon_price;
