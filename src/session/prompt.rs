/// Name of the dataset the session analyses.
pub const DATA_FILE_NAME: &str = "traffic_accidents.csv";

/// Dataset prompt: the column contract of `traffic_accidents.csv`.
pub const DATASET_PROMPT: &str = "Use the file traffic_accidents.csv for your analysis. The column names are:\n\n\
Variable\tDescription\n\
accidents\tNumber of recorded accidents, as a positive integer\n\
traffic_fine_amount\tTraffic fine amount, expressed in thousands of USD\n\
traffic_density\tTraffic density index, scale from 0 (low) to 10 (high)\n\
traffic_lights\tProportion of traffic lights in the area (0 to 1)\n\
pavement_quality\tPavement quality, scale from 0 (very poor) to 5 (excellent)\n\
urban_area\tUrban area (1) or rural area (0), as an integer\n\
average_speed\tAverage speed of vehicles in km/h\n\
rain_intensity\tRain intensity, scale from 0 (no rain) to 3 (heavy rain)\n\
vehicle_count\tEstimated number of vehicles, in thousands, as an integer\n\
time_of_day\tTime of day in 24-hour format (0 to 24)";
